//! Positional file I/O
//!
//! Offset-addressed reads and writes against a shared file handle, so
//! worker threads can operate on disjoint ranges of one open file without
//! coordinating a seek position.

use std::fs::File;
use std::io;

/// Read exactly `buf.len()` bytes at `offset`, without moving any cursor.
#[cfg(unix)]
pub fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

/// Write the whole buffer at `offset`, without moving any cursor.
#[cfg(unix)]
pub fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

/// Read exactly `buf.len()` bytes at `offset`, without moving any cursor.
#[cfg(windows)]
pub fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ));
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Write the whole buffer at `offset`, without moving any cursor.
#[cfg(windows)]
pub fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ));
            }
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_read_exact_at() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data");
        std::fs::write(&path, b"0123456789").unwrap();

        let file = File::open(&path).unwrap();
        let mut buf = [0u8; 4];
        read_exact_at(&file, &mut buf, 3).unwrap();
        assert_eq!(&buf, b"3456");

        // Reading past the end must fail rather than short-read.
        let mut buf = [0u8; 4];
        assert!(read_exact_at(&file, &mut buf, 8).is_err());
    }

    #[test]
    fn test_write_all_at_disjoint_ranges() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data");
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0u8; 8]).unwrap();

        write_all_at(&file, b"abcd", 4).unwrap();
        write_all_at(&file, b"wxyz", 0).unwrap();
        drop(file);

        assert_eq!(std::fs::read(&path).unwrap(), b"wxyzabcd");
    }
}
