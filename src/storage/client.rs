//! Object store contract
//!
//! The minimal blocking surface the transfer engine needs from an
//! S3-compatible store. Multi-part orchestration, range math, and checksum
//! handling all live above this trait; transports implement only these
//! primitive calls.

use crate::error::Result;
use std::collections::HashMap;

/// Metadata returned by a head request.
#[derive(Debug, Clone, Default)]
pub struct ObjectHead {
    /// Object size in bytes
    pub size: u64,
    /// User metadata (without the `x-amz-meta-` prefix)
    pub metadata: HashMap<String, String>,
}

impl ObjectHead {
    /// Look up a user metadata value by case-insensitive name.
    ///
    /// HTTP intermediaries may change header casing, so reads must not
    /// depend on the canonical capitalization used for writes.
    pub fn metadata_value(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// One object in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Full object key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
}

/// Blocking contract for an S3-compatible object store.
///
/// All methods are callable concurrently from worker threads.
pub trait ObjectStore: Send + Sync {
    /// Fetch size and metadata for an object; `None` when it does not exist.
    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectHead>>;

    /// List objects under a key prefix in lexicographic order.
    ///
    /// `max_keys` limits the response when only an existence probe is
    /// needed; `None` lists exhaustively.
    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: Option<i32>,
    ) -> Result<Vec<ObjectSummary>>;

    /// Read the byte range `[start, end)` of an object.
    fn get_object_range(&self, bucket: &str, key: &str, start: u64, end: u64) -> Result<Vec<u8>>;

    /// Write a whole object in one request.
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> Result<()>;

    /// Start a multipart upload, returning its upload ID.
    fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String>;

    /// Upload one part (1-based part numbers), returning its ETag.
    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String>;

    /// Complete a multipart upload from `(part_number, etag)` pairs.
    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<(i32, String)>,
    ) -> Result<()>;

    /// Abort a multipart upload, discarding any uploaded parts.
    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_lookup_is_case_insensitive() {
        let mut metadata = HashMap::new();
        metadata.insert("crc32c-checksum".to_string(), "45A8B2C1".to_string());
        let head = ObjectHead {
            size: 12,
            metadata,
        };

        assert_eq!(head.metadata_value("Crc32c-Checksum"), Some("45A8B2C1"));
        assert_eq!(head.metadata_value("CRC32C-CHECKSUM"), Some("45A8B2C1"));
        assert_eq!(head.metadata_value("other"), None);
    }
}
