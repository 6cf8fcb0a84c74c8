//! CLI arguments and defaults

use clap::Parser;

/// s3parcp - parallel copy between local filesystems and S3
#[derive(Parser, Debug, Clone)]
#[command(name = "s3parcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Copy files to, from, and between S3-compatible object stores with multi-part parallelism")]
#[command(long_about = r#"
s3parcp copies bytes between a local filesystem and an S3-compatible object
store (and between local paths), using multi-part parallel transfers for
throughput on large objects.

Examples:
  s3parcp large.bin s3://bucket/large.bin            # Upload
  s3parcp s3://bucket/large.bin large.bin            # Download
  s3parcp -r data/ s3://bucket/data/                 # Recursive upload
  s3parcp --checksum big.bin s3://bucket/big.bin     # Upload with CRC32C
"#)]
pub struct CliArgs {
    /// Source to copy from
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Destination to copy to (defaults to the source's base name)
    #[arg(value_name = "DESTINATION")]
    pub destination: Option<String>,

    /// Part size in bytes for multi-part transfers (default: pagesize * 10240)
    #[arg(short = 'p', long, value_name = "BYTES")]
    pub part_size: Option<u64>,

    /// Number of transfer workers (default: logical CPU count)
    #[arg(short = 'c', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// I/O buffer size in bytes; 0 disables the buffer pool
    #[arg(short = 'b', long, default_value_t = 0, value_name = "BYTES")]
    pub buffer_size: usize,

    /// Compare checksums when downloading, store one in metadata when uploading
    #[arg(long)]
    pub checksum: bool,

    /// Use mmap for checksum reads
    #[arg(short = 'm', long)]
    pub mmap: bool,

    /// Copy directories or folders recursively
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Custom S3 API endpoint; the flag takes precedence over the variable
    #[arg(long, env = "S3PARCP_S3_URL", value_name = "URL")]
    pub s3_url: Option<String>,

    /// Maximum attempts per request
    #[arg(long, default_value_t = 3, value_name = "N")]
    pub max_retries: u32,

    /// Use clear-text HTTP for a custom endpoint
    #[arg(long)]
    pub disable_ssl: bool,

    /// Do not cache AWS credentials on disk
    #[arg(long)]
    pub disable_cached_credentials: bool,

    /// Verbose request and retry logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl CliArgs {
    /// The destination, defaulting to the base name of the source.
    pub fn destination_or_default(&self) -> String {
        match &self.destination {
            Some(destination) => destination.clone(),
            None => base_name(&self.source).to_string(),
        }
    }

    /// The part size, defaulting to a multiple of the system page size.
    pub fn part_size_or_default(&self) -> u64 {
        self.part_size.unwrap_or_else(default_part_size)
    }

    /// The worker count, defaulting to the logical CPU count.
    pub fn concurrency_or_default(&self) -> usize {
        self.concurrency.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Final path segment of a raw path string, ignoring a trailing slash.
fn base_name(raw: &str) -> &str {
    let trimmed = raw.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Default multi-part size: 10240 system pages (40 MiB with 4 KiB pages).
pub fn default_part_size() -> u64 {
    page_size() * 10240
}

#[cfg(unix)]
fn page_size() -> u64 {
    // Safety: sysconf has no side effects; a negative result means the
    // limit is indeterminate and the common page size stands in.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        4096
    }
}

#[cfg(not(unix))]
fn page_size() -> u64 {
    4096
}
