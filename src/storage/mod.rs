//! Object storage module
//!
//! The transport seam between the transfer engine and S3. `ObjectStore` is
//! the contract; `S3Store` implements it over the AWS SDK, `MemoryStore`
//! over an in-process map for exercising transfer paths without a network.

mod client;
mod memory;
mod s3;

pub use client::*;
pub use memory::*;
pub use s3::*;
