//! Chunk-parallel whole-file CRC-32C
//!
//! The file is split into fixed-size parts, hashed by a pool of worker
//! threads reading disjoint ranges through a shared handle, and the part
//! digests are folded back together with the CRC combine in a log-depth
//! tree. The result is bit-identical to hashing the file in one pass.

use crate::checksum::crc32c;
use crate::error::{IoResultExt, Result, S3ParcpError};
use crate::fs::read_exact_at;
use crossbeam::channel::bounded;
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::File;
use std::io;
use std::path::Path;

/// Options for a parallelized checksum run
#[derive(Debug, Clone, Copy)]
pub struct ChecksumOptions {
    /// Number of hashing worker threads
    pub concurrency: usize,
    /// Size in bytes of each hashed part
    pub part_size: u64,
    /// Read through a memory map instead of positional reads
    pub use_mmap: bool,
}

/// A byte range assigned to one hashing worker. Ranges are contiguous,
/// sorted by `start`, and cover the file exactly; all but the last have
/// identical size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PartPlan {
    pub index: u64,
    pub start: u64,
    pub end: u64,
}

/// Digest of a single part, tagged with its index for ordered folding.
struct PartDigest {
    index: u64,
    crc: u32,
}

/// Split `[0, length)` into parts of `part_size` bytes, last part short.
pub(crate) fn plan_parts(length: u64, part_size: u64) -> Vec<PartPlan> {
    let mut parts = Vec::with_capacity(length.div_ceil(part_size) as usize);
    let mut start = 0;
    while start < length {
        let end = (start + part_size).min(length);
        parts.push(PartPlan {
            index: parts.len() as u64,
            start,
            end,
        });
        start = end;
    }
    parts
}

/// Immutable random-access reader shared by the hashing workers.
enum ReaderAt {
    File(File),
    Mmap(Mmap),
}

impl ReaderAt {
    fn open(path: &Path, use_mmap: bool) -> Result<Self> {
        let file = File::open(path).with_path(path)?;
        if use_mmap {
            // Safety: the mapping is read-only and dropped before this call
            // returns; concurrent truncation of the source would be a bug in
            // the caller for the pread path as well.
            let mmap = unsafe { Mmap::map(&file) }.with_path(path)?;
            Ok(Self::Mmap(mmap))
        } else {
            Ok(Self::File(file))
        }
    }

    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        match self {
            Self::File(file) => read_exact_at(file, buf, offset),
            Self::Mmap(mmap) => {
                let start = offset as usize;
                let end = start + buf.len();
                if end > mmap.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "read past end of mapping",
                    ));
                }
                buf.copy_from_slice(&mmap[start..end]);
                Ok(())
            }
        }
    }
}

/// Compute the CRC-32C of a file by hashing `part_size` ranges in parallel.
///
/// An empty file hashes to 0, the CRC-32C of the empty string. The first
/// error from any worker fails the whole checksum; remaining workers are
/// drained before returning. The file handle and any memory map are
/// released on every exit path.
pub fn parallel_crc32c(path: &Path, opts: ChecksumOptions) -> Result<u32> {
    if opts.part_size == 0 {
        return Err(S3ParcpError::config("part size must be greater than zero"));
    }
    if opts.concurrency == 0 {
        return Err(S3ParcpError::config("concurrency must be at least 1"));
    }

    let length = std::fs::metadata(path).with_path(path)?.len();
    if length == 0 {
        return Ok(0);
    }

    let reader = ReaderAt::open(path, opts.use_mmap)?;
    let parts = plan_parts(length, opts.part_size);
    let num_parts = parts.len();
    let last_part_size = parts[num_parts - 1].end - parts[num_parts - 1].start;

    let (part_tx, part_rx) = bounded::<PartPlan>(num_parts);
    let (digest_tx, digest_rx) = bounded::<Result<PartDigest>>(num_parts);

    let mut crcs = vec![0u32; num_parts];
    let mut first_error = None;

    std::thread::scope(|scope| {
        let reader = &reader;
        for _ in 0..opts.concurrency.min(num_parts) {
            let part_rx = part_rx.clone();
            let digest_tx = digest_tx.clone();
            scope.spawn(move || {
                for part in part_rx {
                    let mut buf = vec![0u8; (part.end - part.start) as usize];
                    let digest = reader
                        .read_exact_at(&mut buf, part.start)
                        .with_path(path)
                        .map(|()| PartDigest {
                            index: part.index,
                            crc: crc32c::hash(&buf),
                        });
                    if digest_tx.send(digest).is_err() {
                        break;
                    }
                }
            });
        }
        drop(part_rx);
        drop(digest_tx);

        for part in &parts {
            // The channel holds every part, so this send cannot block.
            let _ = part_tx.send(*part);
        }
        drop(part_tx);

        for digest in digest_rx {
            match digest {
                Ok(d) => crcs[d.index as usize] = d.crc,
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

    Ok(fuse_digests(&mut crcs, opts.part_size, length, last_part_size))
}

/// Fold part digests into one checksum with a log₂-depth combine tree.
///
/// At level `n` (1, 2, 4, ...) slot `i` absorbs slot `i + n`. The right
/// subtree normally spans `part_size * n` bytes; that span is clipped when
/// it crosses the end of the file and shortened by the last part's deficit
/// when its right edge lands exactly on the final part.
fn fuse_digests(crcs: &mut [u32], part_size: u64, length: u64, last_part_size: u64) -> u32 {
    let num_parts = crcs.len() as u64;
    let mut n = 1u64;
    while n < num_parts {
        let pairs: Vec<u64> = (0..num_parts)
            .step_by((2 * n) as usize)
            .filter(|i| i + n < num_parts)
            .collect();

        let snapshot: &[u32] = crcs;
        let merged: Vec<(u64, u32)> = pairs
            .into_par_iter()
            .map(|i| {
                let prev_len = (i + n) * part_size;
                let mut len_right = part_size * n;
                if len_right + prev_len > length {
                    len_right = length - prev_len;
                } else if i + n == num_parts - n {
                    len_right -= part_size - last_part_size;
                }
                let crc = crc32c::combine(
                    snapshot[i as usize],
                    snapshot[(i + n) as usize],
                    len_right,
                );
                (i, crc)
            })
            .collect();

        for (i, crc) in merged {
            crcs[i as usize] = crc;
        }
        n <<= 1;
    }
    crcs[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_temp(dir: &TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(data).unwrap();
        path
    }

    #[test]
    fn test_plan_parts_covers_file_exactly() {
        let parts = plan_parts(1212, 10);
        assert_eq!(parts.len(), 122);
        assert_eq!(parts[0].start, 0);
        assert_eq!(parts.last().unwrap().end, 1212);
        assert_eq!(parts.last().unwrap().end - parts.last().unwrap().start, 2);
        for pair in parts.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert_eq!(pair[0].end - pair[0].start, 10);
        }
    }

    #[test]
    fn test_plan_parts_exact_multiple() {
        let parts = plan_parts(100, 10);
        assert_eq!(parts.len(), 10);
        assert!(parts.iter().all(|p| p.end - p.start == 10));
    }

    #[test]
    fn test_parallel_matches_whole_file() {
        let dir = TempDir::new().unwrap();
        // 101 repetitions, 1212 bytes: many parts plus a short final part.
        let data = b"sample bytes".repeat(101);
        let path = write_temp(&dir, "data", &data);

        let opts = ChecksumOptions {
            concurrency: 10,
            part_size: 10,
            use_mmap: false,
        };
        assert_eq!(parallel_crc32c(&path, opts).unwrap(), crc32c::hash(&data));
    }

    #[test]
    fn test_parallel_matches_whole_file_mmap() {
        let dir = TempDir::new().unwrap();
        let data = b"sample bytes".repeat(101);
        let path = write_temp(&dir, "data", &data);

        let opts = ChecksumOptions {
            concurrency: 10,
            part_size: 10,
            use_mmap: true,
        };
        assert_eq!(parallel_crc32c(&path, opts).unwrap(), crc32c::hash(&data));
    }

    #[test]
    fn test_parallel_single_part() {
        let dir = TempDir::new().unwrap();
        let path = write_temp(&dir, "data", b"sample bytes");

        let opts = ChecksumOptions {
            concurrency: 4,
            part_size: 1024 * 1024,
            use_mmap: false,
        };
        assert_eq!(parallel_crc32c(&path, opts).unwrap(), 1168601409);
    }

    #[test]
    fn test_parallel_part_size_one() {
        let dir = TempDir::new().unwrap();
        let data = b"0123456789abcdef";
        let path = write_temp(&dir, "data", data);

        let opts = ChecksumOptions {
            concurrency: 3,
            part_size: 1,
            use_mmap: false,
        };
        assert_eq!(parallel_crc32c(&path, opts).unwrap(), crc32c::hash(data));
    }

    #[test]
    fn test_parallel_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = write_temp(&dir, "empty", b"");

        let opts = ChecksumOptions {
            concurrency: 2,
            part_size: 10,
            use_mmap: false,
        };
        assert_eq!(parallel_crc32c(&path, opts).unwrap(), 0);
    }

    #[test]
    fn test_parallel_varied_part_sizes() {
        let dir = TempDir::new().unwrap();
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let path = write_temp(&dir, "data", &data);
        let expected = crc32c::hash(&data);

        for part_size in [1, 7, 64, 99, 4096, 10_000, 20_000] {
            for concurrency in [1, 2, 8] {
                let opts = ChecksumOptions {
                    concurrency,
                    part_size,
                    use_mmap: false,
                };
                assert_eq!(
                    parallel_crc32c(&path, opts).unwrap(),
                    expected,
                    "part_size={part_size} concurrency={concurrency}"
                );
            }
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let opts = ChecksumOptions {
            concurrency: 1,
            part_size: 10,
            use_mmap: false,
        };
        assert!(parallel_crc32c(Path::new("/no/such/file"), opts).is_err());
    }

    #[test]
    fn test_zero_part_size_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_temp(&dir, "data", b"x");
        let opts = ChecksumOptions {
            concurrency: 1,
            part_size: 0,
            use_mmap: false,
        };
        assert!(parallel_crc32c(&path, opts).is_err());
    }
}
