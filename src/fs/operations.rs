//! Buffered local file operations

use crate::error::{IoResultExt, Result, S3ParcpError};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Default buffer size for stream copies when none is configured.
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Create the parent directory of `path` and any missing ancestors.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_path(parent)?;
        }
    }
    Ok(())
}

/// Stream-copy a regular file. Returns the number of bytes copied.
///
/// Non-regular sources (directories, sockets, device nodes) are rejected;
/// following them would either loop or block.
pub fn copy_file(src: &Path, dst: &Path, buffer_size: usize) -> Result<u64> {
    let metadata = std::fs::metadata(src).with_path(src)?;
    if !metadata.is_file() {
        return Err(S3ParcpError::InvalidTransfer(format!(
            "{} is not a regular file",
            src.display()
        )));
    }

    ensure_parent_dir(dst)?;

    let capacity = if buffer_size > 0 {
        buffer_size
    } else {
        DEFAULT_BUFFER_SIZE
    };

    let mut reader = BufReader::with_capacity(capacity, File::open(src).with_path(src)?);
    let mut writer = BufWriter::with_capacity(capacity, File::create(dst).with_path(dst)?);

    let copied = std::io::copy(&mut reader, &mut writer).with_path(dst)?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_file_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.bin");
        let dst = dir.path().join("deeply/nested/dst.bin");
        std::fs::write(&src, b"sample bytes").unwrap();

        let copied = copy_file(&src, &dst, 0).unwrap();

        assert_eq!(copied, 12);
        assert_eq!(std::fs::read(&dst).unwrap(), b"sample bytes");
    }

    #[test]
    fn test_copy_file_rejects_directory_source() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let err = copy_file(&sub, &dir.path().join("out"), 0).unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
    }

    #[test]
    fn test_copy_file_custom_buffer() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.bin");
        let dst = dir.path().join("dst.bin");
        let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&src, &payload).unwrap();

        copy_file(&src, &dst, 4096).unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), payload);
    }
}
