//! Error types for s3parcp
//!
//! All failures surface as a single error enum so the CLI can map them to
//! exit codes and one-line messages.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for s3parcp operations
#[derive(Error, Debug)]
pub enum S3ParcpError {
    /// Invalid command-line input detected after parsing
    #[error("invalid arguments: {0}")]
    Arg(String),

    /// Bad endpoint, missing region, or other client configuration problem
    #[error("{0}")]
    Config(String),

    /// Access denied or credential refresh failure
    #[error("{0}")]
    Auth(String),

    /// A single-object or single-file source does not exist
    #[error("{0}")]
    NotFound(String),

    /// I/O error during local filesystem operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport failure after retries
    #[error("{operation} failed: {message}")]
    Network { operation: String, message: String },

    /// CRC32C mismatch between the object metadata and the local file
    #[error("checksum mismatch for '{path}': expected {expected}, got {actual}")]
    IntegrityMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// A checksum-verified download found no checksum metadata on the object
    #[error("object '{key}' has no Crc32c-Checksum metadata, try re-uploading with --checksum")]
    MissingChecksum { key: String },

    /// The requested source/destination combination cannot be planned
    #[error("{0}")]
    InvalidTransfer(String),

    /// S3-to-S3 copy or another unimplemented operation was requested
    #[error("{0}")]
    Unsupported(String),

    /// Credential cache read/write failure; logged by the cache, never fatal
    #[error("credential cache error: {0}")]
    Cache(String),
}

impl S3ParcpError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a network error for a named S3 operation
    pub fn network(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an integrity mismatch error
    pub fn integrity_mismatch(
        path: impl Into<PathBuf>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::IntegrityMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Check if this error is an integrity failure
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            Self::IntegrityMismatch { .. } | Self::MissingChecksum { .. }
        )
    }
}

/// Result type alias for s3parcp operations
pub type Result<T> = std::result::Result<T, S3ParcpError>;

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| S3ParcpError::io(path, e))
    }
}
