//! CRC32C checksum module
//!
//! Provides the Castagnoli CRC-32 primitive (hash, combine, hex encoding)
//! and a chunk-parallel whole-file checksum with optional memory-mapped I/O.

pub mod crc32c;
mod parallel;

pub use parallel::*;
