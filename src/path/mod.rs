//! Uniform path abstraction over local and S3 locations
//!
//! A `PathRef` is an immutable tagged location. The variant set is closed,
//! so call sites match on it directly instead of going through a trait.
//! Operations that need to consult the object store take it as an argument;
//! the path itself never holds a client.

use crate::error::{IoResultExt, Result, S3ParcpError};
use crate::storage::ObjectStore;
use std::fmt;
use std::path::PathBuf;

/// A local filesystem path or an S3 location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRef {
    /// A path on the local filesystem, kept in its raw spelling
    Local {
        /// The path as given, including any trailing slash
        raw: String,
    },
    /// An `s3://bucket/key` location
    S3 {
        /// Bucket name
        bucket: String,
        /// Object key or key prefix; empty for the bucket root
        key: String,
        /// The full `s3://` form, including any trailing slash
        raw: String,
    },
}

impl PathRef {
    /// Parse a raw string. Anything with the `s3` scheme is an S3 path;
    /// everything else is local.
    pub fn parse(raw: &str) -> Result<PathRef> {
        match raw.strip_prefix("s3://") {
            Some(rest) => {
                let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
                if bucket.is_empty() {
                    return Err(S3ParcpError::Arg(format!(
                        "s3 path '{raw}' is missing a bucket"
                    )));
                }
                Ok(PathRef::S3 {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    raw: raw.to_string(),
                })
            }
            None => Ok(PathRef::Local {
                raw: raw.to_string(),
            }),
        }
    }

    /// Whether this is an S3 location.
    pub fn is_s3(&self) -> bool {
        matches!(self, PathRef::S3 { .. })
    }

    /// Whether this is a local path.
    pub fn is_local(&self) -> bool {
        !self.is_s3()
    }

    /// The raw spelling of this path.
    pub fn raw(&self) -> &str {
        match self {
            PathRef::Local { raw } | PathRef::S3 { raw, .. } => raw,
        }
    }

    /// The key for S3 paths, the raw path for local ones.
    pub fn key_or_local(&self) -> &str {
        match self {
            PathRef::Local { raw } => raw,
            PathRef::S3 { key, .. } => key,
        }
    }

    /// The bucket of an S3 path; an error for local paths.
    pub fn bucket(&self) -> Result<&str> {
        match self {
            PathRef::S3 { bucket, .. } => Ok(bucket),
            PathRef::Local { raw } => Err(S3ParcpError::InvalidTransfer(format!(
                "{raw} is not an s3 path"
            ))),
        }
    }

    /// The local path as a `PathBuf`; an error for S3 paths.
    pub fn local_path(&self) -> Result<PathBuf> {
        match self {
            PathRef::Local { raw } => Ok(PathBuf::from(raw)),
            PathRef::S3 { raw, .. } => Err(S3ParcpError::InvalidTransfer(format!(
                "{raw} is not a local path"
            ))),
        }
    }

    /// The final path segment of the raw form.
    pub fn base(&self) -> &str {
        let trimmed = self.raw().trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }

    /// Append a suffix, producing a new path. Separators at the joint are
    /// normalized, so suffixes produced by prefix-stripping join cleanly.
    pub fn join(&self, suffix: &str) -> PathRef {
        let suffix = suffix.trim_start_matches('/');
        match self {
            PathRef::Local { raw } => PathRef::Local {
                raw: join_raw(raw, suffix),
            },
            PathRef::S3 { bucket, key, .. } => {
                let key = join_raw(key, suffix);
                PathRef::S3 {
                    bucket: bucket.clone(),
                    raw: format!("s3://{bucket}/{key}"),
                    key,
                }
            }
        }
    }

    /// "directory" for local paths, "folder" for S3 ones. Used in messages.
    pub fn dir_or_folder(&self) -> &'static str {
        if self.is_s3() {
            "folder"
        } else {
            "directory"
        }
    }

    /// "file" for local paths, "object" for S3 ones. Used in messages.
    pub fn file_or_object(&self) -> &'static str {
        if self.is_s3() {
            "object"
        } else {
            "file"
        }
    }

    /// Whether this path denotes a directory.
    ///
    /// A trailing slash forces directory semantics for both variants. An S3
    /// path is otherwise a folder when its key is empty (the bucket root)
    /// or when at least one object exists under `key + "/"`. A local path
    /// that does not exist is not a directory.
    pub fn is_dir(&self, store: &dyn ObjectStore) -> Result<bool> {
        if self.raw().ends_with('/') {
            return Ok(true);
        }
        match self {
            PathRef::Local { raw } => match std::fs::metadata(raw) {
                Ok(metadata) => Ok(metadata.is_dir()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(S3ParcpError::io(raw, e)),
            },
            PathRef::S3 { bucket, key, .. } => {
                if key.is_empty() {
                    return Ok(true);
                }
                // One key is enough to decide; avoid a full listing.
                let probe = store.list_objects(bucket, &format!("{key}/"), Some(1))?;
                Ok(!probe.is_empty())
            }
        }
    }

    /// Whether this path exists as a file or object. The bucket root
    /// always exists.
    pub fn exists(&self, store: &dyn ObjectStore) -> Result<bool> {
        match self {
            PathRef::Local { raw } => match std::fs::metadata(raw) {
                Ok(_) => Ok(true),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(S3ParcpError::io(raw, e)),
            },
            PathRef::S3 { bucket, key, .. } => {
                if key.is_empty() {
                    return Ok(true);
                }
                Ok(store.head_object(bucket, key)?.is_some())
            }
        }
    }

    /// List every transferrable path under this one.
    ///
    /// Local paths walk the filesystem tree and yield files only. S3 paths
    /// yield the single object whose key equals the prefix exactly, or
    /// every object under `prefix + "/"`; folder-marker keys (trailing
    /// slash) carry no bytes and are skipped. Listing a prefix that is
    /// neither is empty, which lets callers distinguish "nothing found".
    pub fn list_under_prefix(&self, store: &dyn ObjectStore) -> Result<Vec<PathRef>> {
        match self {
            PathRef::Local { raw } => {
                if !std::path::Path::new(raw).exists() {
                    return Ok(Vec::new());
                }
                let mut paths = Vec::new();
                for entry in walkdir::WalkDir::new(raw) {
                    let entry = entry.map_err(|e| {
                        let io_err = e
                            .into_io_error()
                            .unwrap_or_else(|| std::io::Error::other("walk failed"));
                        S3ParcpError::io(raw, io_err)
                    })?;
                    if entry.file_type().is_file() {
                        paths.push(PathRef::Local {
                            raw: entry.path().display().to_string(),
                        });
                    }
                }
                Ok(paths)
            }
            PathRef::S3 { bucket, key, .. } => {
                let objects = store.list_objects(bucket, key, None)?;
                let prefix_dir = if key.is_empty() {
                    String::new()
                } else {
                    format!("{}/", key.trim_end_matches('/'))
                };

                let mut paths = Vec::new();
                for object in objects {
                    if object.key.ends_with('/') {
                        continue;
                    }
                    let path = PathRef::S3 {
                        bucket: bucket.clone(),
                        raw: format!("s3://{bucket}/{}", object.key),
                        key: object.key.clone(),
                    };
                    if object.key == *key {
                        // An exact key match is the single object requested,
                        // even when other keys share the prefix.
                        return Ok(vec![path]);
                    }
                    if object.key.starts_with(&prefix_dir) {
                        paths.push(path);
                    }
                }
                Ok(paths)
            }
        }
    }

    /// Create this path as a local directory tree. Only valid for local
    /// paths; the planner uses it when a directory destination is missing.
    pub fn create_local_dir(&self) -> Result<()> {
        let path = self.local_path()?;
        std::fs::create_dir_all(&path).with_path(path)
    }
}

impl fmt::Display for PathRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw())
    }
}

fn join_raw(base: &str, suffix: &str) -> String {
    if base.is_empty() {
        return suffix.to_string();
    }
    if suffix.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use tempfile::TempDir;

    #[test]
    fn test_parse_s3_path() {
        let path = PathRef::parse("s3://my-bucket/path/to/file").unwrap();
        assert!(path.is_s3());
        assert_eq!(path.bucket().unwrap(), "my-bucket");
        assert_eq!(path.key_or_local(), "path/to/file");
        assert_eq!(path.raw(), "s3://my-bucket/path/to/file");
    }

    #[test]
    fn test_parse_bucket_root() {
        let path = PathRef::parse("s3://bucket").unwrap();
        assert_eq!(path.bucket().unwrap(), "bucket");
        assert_eq!(path.key_or_local(), "");
    }

    #[test]
    fn test_parse_local_path() {
        let path = PathRef::parse("/local/path").unwrap();
        assert!(path.is_local());
        assert!(path.bucket().is_err());
        assert_eq!(path.key_or_local(), "/local/path");
    }

    #[test]
    fn test_parse_rejects_empty_bucket() {
        assert!(PathRef::parse("s3://").is_err());
    }

    #[test]
    fn test_base() {
        assert_eq!(PathRef::parse("s3://b/a/c.txt").unwrap().base(), "c.txt");
        assert_eq!(PathRef::parse("/x/y/z").unwrap().base(), "z");
        assert_eq!(PathRef::parse("/x/y/z/").unwrap().base(), "z");
        assert_eq!(PathRef::parse("name").unwrap().base(), "name");
    }

    #[test]
    fn test_join_preserves_invariant() {
        let path = PathRef::parse("s3://bkt/pre/").unwrap().join("/sub/file");
        assert_eq!(path.raw(), "s3://bkt/pre/sub/file");
        assert_eq!(path.key_or_local(), "pre/sub/file");

        let local = PathRef::parse("/dst").unwrap().join("file");
        assert_eq!(local.raw(), "/dst/file");
    }

    #[test]
    fn test_join_into_bucket_root() {
        let path = PathRef::parse("s3://bkt").unwrap().join("file");
        assert_eq!(path.raw(), "s3://bkt/file");
        assert_eq!(path.key_or_local(), "file");
    }

    #[test]
    fn test_wording_helpers() {
        let s3 = PathRef::parse("s3://b/k").unwrap();
        let local = PathRef::parse("/tmp/x").unwrap();
        assert_eq!(s3.dir_or_folder(), "folder");
        assert_eq!(s3.file_or_object(), "object");
        assert_eq!(local.dir_or_folder(), "directory");
        assert_eq!(local.file_or_object(), "file");
    }

    #[test]
    fn test_local_is_dir_and_exists() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let file = dir.path().join("f");
        std::fs::write(&file, b"x").unwrap();

        let dir_ref = PathRef::parse(dir.path().to_str().unwrap()).unwrap();
        let file_ref = PathRef::parse(file.to_str().unwrap()).unwrap();
        let missing = PathRef::parse(dir.path().join("nope").to_str().unwrap()).unwrap();

        assert!(dir_ref.is_dir(&store).unwrap());
        assert!(!file_ref.is_dir(&store).unwrap());
        assert!(file_ref.exists(&store).unwrap());
        assert!(!missing.exists(&store).unwrap());
        assert!(!missing.is_dir(&store).unwrap());
    }

    #[test]
    fn test_trailing_slash_forces_directory() {
        let store = MemoryStore::new();
        let path = PathRef::parse("/does/not/exist/").unwrap();
        assert!(path.is_dir(&store).unwrap());

        let s3 = PathRef::parse("s3://bkt/prefix/").unwrap();
        assert!(s3.is_dir(&store).unwrap());
    }

    #[test]
    fn test_s3_is_dir_by_listing() {
        let store = MemoryStore::new();
        store.insert_object("bkt", "prefix/file", b"x".to_vec());

        let dir = PathRef::parse("s3://bkt/prefix").unwrap();
        assert!(dir.is_dir(&store).unwrap());

        let not_dir = PathRef::parse("s3://bkt/prefix/file").unwrap();
        assert!(!not_dir.is_dir(&store).unwrap());

        let root = PathRef::parse("s3://bkt").unwrap();
        assert!(root.is_dir(&store).unwrap());
    }

    #[test]
    fn test_s3_exists() {
        let store = MemoryStore::new();
        store.insert_object("bkt", "k", b"x".to_vec());

        assert!(PathRef::parse("s3://bkt/k").unwrap().exists(&store).unwrap());
        assert!(!PathRef::parse("s3://bkt/other")
            .unwrap()
            .exists(&store)
            .unwrap());
        assert!(PathRef::parse("s3://bkt").unwrap().exists(&store).unwrap());
    }

    #[test]
    fn test_list_under_prefix_local() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        std::fs::write(dir.path().join("b"), b"1").unwrap();
        std::fs::create_dir(dir.path().join("c")).unwrap();
        std::fs::write(dir.path().join("c/d"), b"2").unwrap();

        let root = PathRef::parse(dir.path().to_str().unwrap()).unwrap();
        let mut listed: Vec<String> = root
            .list_under_prefix(&store)
            .unwrap()
            .into_iter()
            .map(|p| p.raw().to_string())
            .collect();
        listed.sort();

        assert_eq!(listed.len(), 2);
        assert!(listed[0].ends_with("/b"));
        assert!(listed[1].ends_with("/c/d"));
    }

    #[test]
    fn test_list_under_prefix_exact_key_wins() {
        let store = MemoryStore::new();
        store.insert_object("bkt", "data", b"1".to_vec());
        store.insert_object("bkt", "data-other", b"2".to_vec());
        store.insert_object("bkt", "data/nested", b"3".to_vec());

        // The exact key is returned alone even though other keys share the
        // prefix.
        let listed = PathRef::parse("s3://bkt/data")
            .unwrap()
            .list_under_prefix(&store)
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key_or_local(), "data");
    }

    #[test]
    fn test_list_under_prefix_excludes_partial_matches() {
        let store = MemoryStore::new();
        store.insert_object("bkt", "pre/a", b"1".to_vec());
        store.insert_object("bkt", "pre/b/c", b"2".to_vec());
        store.insert_object("bkt", "prefix-sibling", b"3".to_vec());

        let listed = PathRef::parse("s3://bkt/pre")
            .unwrap()
            .list_under_prefix(&store)
            .unwrap();
        let keys: Vec<&str> = listed.iter().map(|p| p.key_or_local()).collect();
        assert_eq!(keys, vec!["pre/a", "pre/b/c"]);
    }

    #[test]
    fn test_list_under_prefix_skips_folder_markers() {
        let store = MemoryStore::new();
        store.insert_object("bkt", "pre/", Vec::new());
        store.insert_object("bkt", "pre/a", b"1".to_vec());

        let listed = PathRef::parse("s3://bkt/pre")
            .unwrap()
            .list_under_prefix(&store)
            .unwrap();
        let keys: Vec<&str> = listed.iter().map(|p| p.key_or_local()).collect();
        assert_eq!(keys, vec!["pre/a"]);
    }

    #[test]
    fn test_list_bucket_root() {
        let store = MemoryStore::new();
        store.insert_object("bkt", "a", b"1".to_vec());
        store.insert_object("bkt", "b/c", b"2".to_vec());

        let listed = PathRef::parse("s3://bkt")
            .unwrap()
            .list_under_prefix(&store)
            .unwrap();
        assert_eq!(listed.len(), 2);
    }
}
