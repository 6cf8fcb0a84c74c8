//! In-memory object store
//!
//! A process-local `ObjectStore` used to exercise the planner and copier
//! without a network. Listing order, exact-key semantics, ranged reads, and
//! the multipart protocol mirror S3 closely enough for end-to-end tests.

use crate::error::{Result, S3ParcpError};
use crate::storage::{ObjectHead, ObjectStore, ObjectSummary};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    metadata: HashMap<String, String>,
}

#[derive(Debug)]
struct PendingUpload {
    bucket: String,
    key: String,
    metadata: HashMap<String, String>,
    parts: BTreeMap<i32, Vec<u8>>,
}

/// In-memory `ObjectStore` implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    // BTreeMap keyed by (bucket, key) gives S3's lexicographic listing order.
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    uploads: Mutex<HashMap<String, PendingUpload>>,
    next_upload_id: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object directly, bypassing the upload protocol.
    pub fn insert_object(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.insert_object_with_metadata(bucket, key, data, HashMap::new());
    }

    /// Insert an object with user metadata.
    pub fn insert_object_with_metadata(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        metadata: HashMap<String, String>,
    ) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject { data, metadata },
        );
    }

    /// Read an object's bytes back out, if present.
    pub fn object_data(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.data.clone())
    }

    /// Read an object's user metadata back out, if present.
    pub fn object_metadata(&self, bucket: &str, key: &str) -> Option<HashMap<String, String>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.metadata.clone())
    }

    /// Overwrite an object's user metadata in place.
    pub fn set_object_metadata(&self, bucket: &str, key: &str, metadata: HashMap<String, String>) {
        if let Some(object) = self
            .objects
            .lock()
            .unwrap()
            .get_mut(&(bucket.to_string(), key.to_string()))
        {
            object.metadata = metadata;
        }
    }

    /// Number of multipart uploads started and never completed or aborted.
    pub fn pending_upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

impl ObjectStore for MemoryStore {
    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectHead>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| ObjectHead {
                size: o.data.len() as u64,
                metadata: o.metadata.clone(),
            }))
    }

    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: Option<i32>,
    ) -> Result<Vec<ObjectSummary>> {
        let objects = self.objects.lock().unwrap();
        let mut summaries = Vec::new();
        for ((b, key), object) in objects.iter() {
            if b == bucket && key.starts_with(prefix) {
                summaries.push(ObjectSummary {
                    key: key.clone(),
                    size: object.data.len() as u64,
                });
                if let Some(limit) = max_keys {
                    if summaries.len() >= limit as usize {
                        break;
                    }
                }
            }
        }
        Ok(summaries)
    }

    fn get_object_range(&self, bucket: &str, key: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        let objects = self.objects.lock().unwrap();
        let object = objects
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| S3ParcpError::NotFound(format!("no object at s3://{bucket}/{key}")))?;
        let len = object.data.len() as u64;
        if start >= end || end > len {
            return Err(S3ParcpError::network(
                "get object",
                format!("range {start}-{end} is invalid for object of {len} bytes"),
            ));
        }
        Ok(object.data[start as usize..end as usize].to_vec())
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        self.insert_object_with_metadata(bucket, key, body, metadata);
        Ok(())
    }

    fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String> {
        let upload_id = format!(
            "upload-{}",
            self.next_upload_id.fetch_add(1, Ordering::SeqCst)
        );
        self.uploads.lock().unwrap().insert(
            upload_id.clone(),
            PendingUpload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                metadata,
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    fn upload_part(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String> {
        let mut uploads = self.uploads.lock().unwrap();
        let upload = uploads
            .get_mut(upload_id)
            .ok_or_else(|| S3ParcpError::network("upload part", "unknown upload id"))?;
        upload.parts.insert(part_number, body);
        Ok(format!("\"etag-{part_number}\""))
    }

    fn complete_multipart_upload(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        parts: Vec<(i32, String)>,
    ) -> Result<()> {
        let upload = self
            .uploads
            .lock()
            .unwrap()
            .remove(upload_id)
            .ok_or_else(|| S3ParcpError::network("complete multipart upload", "unknown upload id"))?;

        let mut data = Vec::new();
        for (part_number, _etag) in &parts {
            let part = upload.parts.get(part_number).ok_or_else(|| {
                S3ParcpError::network(
                    "complete multipart upload",
                    format!("part {part_number} was never uploaded"),
                )
            })?;
            data.extend_from_slice(part);
        }

        self.insert_object_with_metadata(&upload.bucket, &upload.key, data, upload.metadata);
        Ok(())
    }

    fn abort_multipart_upload(&self, _bucket: &str, _key: &str, upload_id: &str) -> Result<()> {
        self.uploads.lock().unwrap().remove(upload_id);
        Ok(())
    }
}
