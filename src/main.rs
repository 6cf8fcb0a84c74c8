//! s3parcp CLI
//!
//! Parses arguments, wires the S3 client and credential cache, plans the
//! copy, and runs it. Usage errors exit 2 (via clap); runtime failures
//! exit 1 with a one-line message.

use clap::Parser;
use s3parcp::config::CliArgs;
use s3parcp::error::{Result, S3ParcpError};
use s3parcp::path::PathRef;
use s3parcp::storage::{ClientConfig, ObjectStore, S3Store};
use s3parcp::transfer::{Copier, CopierOptions, TransferPlanner};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = CliArgs::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args) {
        eprintln!("s3parcp: {e}");
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    let source = args.source.clone();
    let destination = args.destination_or_default();

    let src = PathRef::parse(&source)?;
    let dst = PathRef::parse(&destination)?;

    let client_config = ClientConfig {
        s3_url: args.s3_url.clone(),
        disable_ssl: args.disable_ssl,
        max_retries: args.max_retries,
        cached_credentials: !args.disable_cached_credentials,
    };
    let store: Arc<dyn ObjectStore> = Arc::new(S3Store::connect(&client_config)?);

    let planner = TransferPlanner::new(store.as_ref());
    let jobs = planner.plan(&src, &dst, args.recursive)?;

    if jobs.is_empty() && !args.recursive {
        return Err(S3ParcpError::NotFound(format!(
            "no {} found at path {src}",
            src.file_or_object()
        )));
    }

    let options = CopierOptions {
        buffer_size: args.buffer_size,
        checksum: args.checksum,
        concurrency: args.concurrency_or_default(),
        part_size: args.part_size_or_default(),
        max_retries: args.max_retries,
        use_mmap: args.mmap,
        verbose: args.verbose,
    };
    let copier = Copier::new(options, store);
    copier.run_all(jobs)
}
