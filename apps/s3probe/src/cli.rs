//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use s3probe_loadgen::GeneratorKind;
use s3probe_suite::ListingScheme;

/// Smoke and load tests for S3-compatible object storage.
#[derive(Debug, Parser)]
#[command(name = "s3probe", version, about)]
pub struct Cli {
    /// JSON credential file; environment variables override its values.
    #[arg(short, long, global = true, env = "S3PROBE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// What to run.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Bucket settings, object CRUD, presigned access, versions and listings.
    Smoke,
    /// Probe the user-metadata size limit and listing pagination.
    Limits(LimitsArgs),
    /// Presign every PDF below the load-test folder and time the signing.
    Presign(PresignArgs),
    /// Upload generated PDF documents concurrently.
    Load(LoadArgs),
    /// Count objects below a prefix.
    Count(CountArgs),
}

/// Options of `limits`.
#[derive(Debug, Args)]
pub struct LimitsArgs {
    /// Metadata pairs of the first attempt.
    #[arg(long, default_value_t = 8)]
    pub start: usize,
    /// Pairs added per attempt.
    #[arg(long, default_value_t = 8)]
    pub step: usize,
    /// Largest number of pairs to try.
    #[arg(long, default_value_t = 64)]
    pub max_pairs: usize,
    /// Length of each metadata value.
    #[arg(long, default_value_t = 100)]
    pub value_len: usize,
}

/// Options of `presign`.
#[derive(Debug, Args)]
pub struct PresignArgs {
    /// URL validity in seconds.
    #[arg(long, default_value_t = 60)]
    pub expires: u64,
    /// Stop after this many listed objects.
    #[arg(long)]
    pub limit: Option<u64>,
}

/// Options of `load`.
#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Concurrent upload workers.
    #[arg(short, long, default_value_t = 1)]
    pub threads: usize,
    /// Containers to create; 0 uploads straight into the root folder.
    #[arg(short, long, default_value_t = 0)]
    pub containers: u32,
    /// Documents per container.
    #[arg(short, long, default_value_t = 10)]
    pub docs: u32,
    /// Target bucket (default: `bucket_for_load_test`).
    #[arg(long)]
    pub bucket: Option<String>,
    /// Root folder (default: `folder_for_load_test`).
    #[arg(long)]
    pub root: Option<String>,
    /// Document generator: tax-receipts or sequential.
    #[arg(long, default_value = "tax-receipts")]
    pub generator: GeneratorKind,
    /// Also upload the JSON record of every document as `<title>.json`.
    #[arg(long)]
    pub json_sidecar: bool,
}

/// Options of `count`.
#[derive(Debug, Args)]
pub struct CountArgs {
    /// Bucket to list (default: `bucket_for_smoke_test`).
    #[arg(long)]
    pub bucket: Option<String>,
    /// Logical key prefix.
    #[arg(long, default_value = "")]
    pub prefix: String,
    /// Listing API: marker, continuation or versions.
    #[arg(long, default_value = "continuation")]
    pub scheme: ListingScheme,
    /// Objects per page.
    #[arg(long, default_value_t = 1000)]
    pub page_size: u32,
    /// Stop counting after this many objects.
    #[arg(long)]
    pub cap: Option<u64>,
}
