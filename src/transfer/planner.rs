//! Copy planning
//!
//! Expands a `(source, destination, recursive)` request into the list of
//! per-file copy jobs the copier executes.

use crate::error::{Result, S3ParcpError};
use crate::path::PathRef;
use crate::storage::ObjectStore;

/// A single file or object copy. Immutable once planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    /// Where the bytes come from
    pub src: PathRef,
    /// Where the bytes go
    pub dst: PathRef,
}

impl CopyJob {
    /// Create a new copy job.
    pub fn new(src: PathRef, dst: PathRef) -> Self {
        Self { src, dst }
    }
}

/// Expands source/destination pairs into copy jobs.
pub struct TransferPlanner<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> TransferPlanner<'a> {
    /// Create a planner over the given store.
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Plan the jobs required to copy `src` to `dst`.
    ///
    /// Directory sources require `recursive` and vice versa. A missing
    /// destination for a directory source is treated as (and locally
    /// created as) a directory, matching S3 where folders spring into
    /// existence; a destination that exists as a file/object is an error
    /// for a directory source. Planning is read-only apart from that
    /// directory creation, so calling it twice yields equal job lists.
    pub fn plan(&self, src: &PathRef, dst: &PathRef, recursive: bool) -> Result<Vec<CopyJob>> {
        let dst_exists = dst.exists(self.store)?;
        let src_is_dir = src.is_dir(self.store)?;
        let mut dst_is_dir = match dst.is_dir(self.store) {
            Ok(is_dir) => is_dir,
            // The destination may not exist yet; only surface probe errors
            // for destinations that do.
            Err(e) if !dst_exists => {
                tracing::debug!(dst = %dst, error = %e, "destination directory probe failed");
                false
            }
            Err(e) => return Err(e),
        };

        if src_is_dir && !recursive {
            return Err(S3ParcpError::InvalidTransfer(format!(
                "source {src} is a {} but --recursive was not specified",
                src.dir_or_folder()
            )));
        }
        if !src_is_dir && recursive {
            return Err(S3ParcpError::InvalidTransfer(format!(
                "source {src} is not a {} but --recursive was specified",
                src.dir_or_folder()
            )));
        }

        if src_is_dir && !dst_is_dir {
            if dst_exists {
                return Err(S3ParcpError::InvalidTransfer(format!(
                    "cannot copy {} {src} to existing {} {dst}",
                    src.dir_or_folder(),
                    dst.file_or_object()
                )));
            }
            // S3 folders exist implicitly; create the local counterpart so
            // both destinations behave the same.
            if dst.is_local() {
                dst.create_local_dir()?;
            }
            dst_is_dir = true;
        }

        let src_paths = src.list_under_prefix(self.store)?;
        let mut jobs = Vec::with_capacity(src_paths.len());

        for path in src_paths {
            let dst_path = if !src_is_dir && dst_is_dir {
                dst.join(src.base())
            } else if src_is_dir && dst_is_dir {
                let suffix = &path.key_or_local()[src.key_or_local().len()..];
                dst.join(suffix)
            } else {
                dst.clone()
            };
            jobs.push(CopyJob::new(path, dst_path));
        }

        Ok(jobs)
    }
}
