//! Local filesystem helpers
//!
//! Positional (offset-addressed) file I/O shared by the parallel checksum
//! and the multi-part transfer paths, plus buffered whole-file copy.

mod operations;
mod positioned;

pub use operations::*;
pub use positioned::*;
