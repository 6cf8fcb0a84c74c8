//! # s3parcp - parallel S3 copy
//!
//! s3parcp copies bytes between a local filesystem and an S3-compatible
//! object store (and between local paths), with an emphasis on throughput
//! for large objects via multi-part parallel transfers.
//!
//! ## Features
//!
//! - **Multi-part parallel transfers**: uploads and downloads split into
//!   fixed-size parts handled by a worker pool
//! - **End-to-end CRC32C integrity**: chunk-parallel Castagnoli checksums
//!   with a combine tree, carried in object metadata
//! - **Recursive copies**: directory trees and key prefixes expand into
//!   per-file jobs
//! - **Cached credentials**: short-lived AWS credentials persist between
//!   invocations behind an atomic file cache
//!
//! ## Quick Start
//!
//! ```no_run
//! use s3parcp::path::PathRef;
//! use s3parcp::storage::{ClientConfig, ObjectStore, S3Store};
//! use s3parcp::transfer::{Copier, CopierOptions, TransferPlanner};
//! use std::sync::Arc;
//!
//! let store: Arc<dyn ObjectStore> =
//!     Arc::new(S3Store::connect(&ClientConfig::default()).unwrap());
//!
//! let src = PathRef::parse("data.bin").unwrap();
//! let dst = PathRef::parse("s3://bucket/data.bin").unwrap();
//!
//! let jobs = TransferPlanner::new(store.as_ref())
//!     .plan(&src, &dst, false)
//!     .unwrap();
//!
//! let copier = Copier::new(CopierOptions::default(), store);
//! copier.run_all(jobs).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checksum;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fs;
pub mod path;
pub mod storage;
pub mod transfer;

// Re-export commonly used types
pub use config::CliArgs;
pub use error::{Result, S3ParcpError};
pub use path::PathRef;
pub use transfer::{Copier, CopierOptions, CopyJob, TransferPlanner};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
