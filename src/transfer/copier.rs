//! Copy execution engine
//!
//! A fixed-size pool of worker threads consumes planned jobs from a
//! bounded channel. Each worker runs one job to completion; a single job
//! may itself fan out into parallel multi-part reads or writes. The pool
//! always drains the queue, then reports the first failure.

use crate::checksum::{crc32c, parallel_crc32c, plan_parts, ChecksumOptions};
use crate::error::{IoResultExt, Result, S3ParcpError};
use crate::fs::{copy_file, ensure_parent_dir, read_exact_at, write_all_at};
use crate::path::PathRef;
use crate::storage::{ObjectHead, ObjectStore};
use crate::transfer::CopyJob;
use crossbeam::channel::bounded;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Name of the user metadata entry holding the CRC32C checksum.
///
/// The capitalization is load-bearing: S3 merges metadata entries whose
/// names differ only in case instead of overwriting them, so writing any
/// other spelling would leave stale checksums behind.
pub const CRC32C_CHECKSUM_METADATA_NAME: &str = "Crc32c-Checksum";

/// Configuration for a `Copier`.
#[derive(Debug, Clone)]
pub struct CopierOptions {
    /// Stream-copy buffer size in bytes; 0 selects a default
    pub buffer_size: usize,
    /// Compute and verify CRC32C checksums end to end
    pub checksum: bool,
    /// Worker threads for jobs, and parts within a job
    pub concurrency: usize,
    /// Multi-part size in bytes
    pub part_size: u64,
    /// Maximum attempts per request, enforced by the transport
    pub max_retries: u32,
    /// Read checksum input through a memory map
    pub use_mmap: bool,
    /// Log a line per completed job
    pub verbose: bool,
}

impl Default for CopierOptions {
    fn default() -> Self {
        Self {
            buffer_size: 0,
            checksum: false,
            concurrency: num_cpus::get(),
            part_size: crate::config::default_part_size(),
            max_retries: 3,
            use_mmap: false,
            verbose: false,
        }
    }
}

/// Executes copy jobs against local disks and an object store.
pub struct Copier {
    options: CopierOptions,
    store: Arc<dyn ObjectStore>,
}

impl Copier {
    /// Create a new copier.
    pub fn new(options: CopierOptions, store: Arc<dyn ObjectStore>) -> Self {
        Self { options, store }
    }

    /// Execute all jobs with up to `concurrency` running at once.
    ///
    /// Every job runs to completion before this returns; the first job
    /// error is the one reported. Job completion order is unspecified.
    pub fn run_all(&self, jobs: Vec<CopyJob>) -> Result<()> {
        let num_jobs = jobs.len();
        if num_jobs == 0 {
            return Ok(());
        }

        let (job_tx, job_rx) = bounded::<CopyJob>(num_jobs);
        let (result_tx, result_rx) = bounded::<Result<()>>(num_jobs);
        let mut first_error = None;

        std::thread::scope(|scope| {
            for _ in 0..self.options.concurrency.min(num_jobs).max(1) {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for job in job_rx {
                        if result_tx.send(self.copy(&job)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(result_tx);

            for job in jobs {
                // Channel capacity equals the job count; never blocks.
                let _ = job_tx.send(job);
            }
            drop(job_tx);

            for result in result_rx {
                if let Err(e) = result {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        });

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Execute a single copy job.
    pub fn copy(&self, job: &CopyJob) -> Result<()> {
        let bytes = match (&job.src, &job.dst) {
            (PathRef::S3 { .. }, PathRef::S3 { .. }) => {
                return Err(S3ParcpError::Unsupported(
                    "copying between s3 paths is not supported".to_string(),
                ));
            }
            (PathRef::Local { .. }, PathRef::S3 { .. }) => {
                self.upload(&job.src.local_path()?, &job.dst)?
            }
            (PathRef::S3 { .. }, PathRef::Local { .. }) => {
                self.download(&job.src, &job.dst.local_path()?)?
            }
            (PathRef::Local { .. }, PathRef::Local { .. }) => copy_file(
                &job.src.local_path()?,
                &job.dst.local_path()?,
                self.options.buffer_size,
            )?,
        };

        if self.options.verbose {
            info!(
                "copied {} to {} ({})",
                job.src,
                job.dst,
                humansize::format_size(bytes, humansize::BINARY)
            );
        }
        Ok(())
    }

    fn checksum_options(&self) -> ChecksumOptions {
        ChecksumOptions {
            concurrency: self.options.concurrency.max(1),
            part_size: self.options.part_size,
            use_mmap: self.options.use_mmap,
        }
    }

    fn upload(&self, src: &Path, dst: &PathRef) -> Result<u64> {
        let bucket = dst.bucket()?;
        let key = dst.key_or_local();

        let mut metadata = HashMap::new();
        if self.options.checksum {
            let sum = parallel_crc32c(src, self.checksum_options())?;
            metadata.insert(
                CRC32C_CHECKSUM_METADATA_NAME.to_string(),
                crc32c::to_hex(sum),
            );
        }

        let size = std::fs::metadata(src).with_path(src)?.len();
        if size <= self.options.part_size {
            let body = std::fs::read(src).with_path(src)?;
            self.store.put_object(bucket, key, body, metadata)?;
        } else {
            self.multipart_upload(src, bucket, key, size, metadata)?;
        }
        Ok(size)
    }

    fn multipart_upload(
        &self,
        src: &Path,
        bucket: &str,
        key: &str,
        size: u64,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let upload_id = self
            .store
            .create_multipart_upload(bucket, key, metadata)?;

        match self.upload_parts(src, bucket, key, &upload_id, size) {
            Ok(parts) => self
                .store
                .complete_multipart_upload(bucket, key, &upload_id, parts),
            Err(e) => {
                if let Err(abort_err) = self.store.abort_multipart_upload(bucket, key, &upload_id) {
                    warn!(
                        key = key,
                        error = %abort_err,
                        "failed to abort multipart upload"
                    );
                }
                Err(e)
            }
        }
    }

    fn upload_parts(
        &self,
        src: &Path,
        bucket: &str,
        key: &str,
        upload_id: &str,
        size: u64,
    ) -> Result<Vec<(i32, String)>> {
        let file = File::open(src).with_path(src)?;
        let parts = plan_parts(size, self.options.part_size);
        let num_parts = parts.len();

        let (part_tx, part_rx) = bounded::<crate::checksum::PartPlan>(num_parts);
        let (result_tx, result_rx) = bounded::<Result<(i32, String)>>(num_parts);

        let mut completed = Vec::with_capacity(num_parts);
        let mut first_error = None;

        std::thread::scope(|scope| {
            let file = &file;
            let store = self.store.as_ref();
            for _ in 0..self.options.concurrency.min(num_parts).max(1) {
                let part_rx = part_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for part in part_rx {
                        let part_number = part.index as i32 + 1;
                        let result = read_part(file, src, part.start, part.end).and_then(|buf| {
                            let etag =
                                store.upload_part(bucket, key, upload_id, part_number, buf)?;
                            Ok((part_number, etag))
                        });
                        if result_tx.send(result).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(part_rx);
            drop(result_tx);

            for part in &parts {
                let _ = part_tx.send(*part);
            }
            drop(part_tx);

            for result in result_rx {
                match result {
                    Ok(part) => completed.push(part),
                    Err(e) => {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }
        });

        if let Some(e) = first_error {
            return Err(e);
        }
        completed.sort_by_key(|(part_number, _)| *part_number);
        Ok(completed)
    }

    fn download(&self, src: &PathRef, dst: &Path) -> Result<u64> {
        let bucket = src.bucket()?;
        let key = src.key_or_local();

        let head = self.store.head_object(bucket, key)?.ok_or_else(|| {
            S3ParcpError::NotFound(format!("no object found at path {src}"))
        })?;

        ensure_parent_dir(dst)?;
        let file = File::create(dst).with_path(dst)?;
        file.set_len(head.size).with_path(dst)?;
        if head.size > 0 {
            self.download_parts(&file, bucket, key, head.size, dst)?;
        }
        drop(file);

        if self.options.checksum {
            self.verify_download(&head, key, dst)?;
        }
        Ok(head.size)
    }

    fn download_parts(
        &self,
        file: &File,
        bucket: &str,
        key: &str,
        size: u64,
        dst: &Path,
    ) -> Result<()> {
        let parts = plan_parts(size, self.options.part_size);
        let num_parts = parts.len();

        let (part_tx, part_rx) = bounded::<crate::checksum::PartPlan>(num_parts);
        let (result_tx, result_rx) = bounded::<Result<()>>(num_parts);
        let mut first_error = None;

        std::thread::scope(|scope| {
            let store = self.store.as_ref();
            for _ in 0..self.options.concurrency.min(num_parts).max(1) {
                let part_rx = part_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for part in part_rx {
                        let result = store
                            .get_object_range(bucket, key, part.start, part.end)
                            .and_then(|data| {
                                let expected = (part.end - part.start) as usize;
                                if data.len() != expected {
                                    return Err(S3ParcpError::network(
                                        "get object",
                                        format!(
                                            "range read returned {} bytes, expected {expected}",
                                            data.len()
                                        ),
                                    ));
                                }
                                write_all_at(file, &data, part.start).with_path(dst)
                            });
                        if result_tx.send(result).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(part_rx);
            drop(result_tx);

            for part in &parts {
                let _ = part_tx.send(*part);
            }
            drop(part_tx);

            for result in result_rx {
                if let Err(e) = result {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        });

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn verify_download(&self, head: &ObjectHead, key: &str, dst: &Path) -> Result<()> {
        let expected_hex = head
            .metadata_value(CRC32C_CHECKSUM_METADATA_NAME)
            .ok_or_else(|| S3ParcpError::MissingChecksum {
                key: key.to_string(),
            })?;
        let expected = crc32c::parse_hex(expected_hex)?;
        let actual = parallel_crc32c(dst, self.checksum_options())?;

        if expected != actual {
            return Err(S3ParcpError::integrity_mismatch(
                dst,
                crc32c::to_hex(expected),
                crc32c::to_hex(actual),
            ));
        }
        Ok(())
    }
}

fn read_part(file: &File, path: &Path, start: u64, end: u64) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; (end - start) as usize];
    read_exact_at(file, &mut buf, start).with_path(path)?;
    Ok(buf)
}
