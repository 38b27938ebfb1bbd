//! s3probe - smoke and load tests for S3-compatible object storage.
//!
//! # Usage
//!
//! ```text
//! s3probe --config cred-local-minio.json smoke
//! s3probe load --threads 8 --containers 4 --docs 250
//! s3probe count --bucket load --prefix load/ --scheme marker
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `S3PROBE_CONFIG` | JSON credential file (same as `--config`) |
//! | `S3_ENDPOINT_URL` | Endpoint URL |
//! | `AWS_REGION` / `DEFAULT_REGION` | Signing region |
//! | `ACCESS_KEY` / `AWS_ACCESS_KEY_ID` | Access key ID |
//! | `SECRET_KEY` / `AWS_SECRET_ACCESS_KEY` | Secret access key |
//! | `LOG_LEVEL` | Log level filter |
//! | `RUST_LOG` | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod cli;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use s3probe_client::ObjectStore;
use s3probe_core::ServiceProperties;
use s3probe_loadgen::{LoadConfig, LoadTest};
use s3probe_suite::{LimitSuite, MetadataProbe, PresignSuite, SmokeSuite, SuiteReport, count_objects};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, CountArgs, LimitsArgs, LoadArgs, PresignArgs};

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the configured log level.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    Ok(())
}

/// Log a suite report and turn it into an exit code.
fn finish_suite(report: &SuiteReport) -> ExitCode {
    for line in report.to_string().lines() {
        info!("{line}");
    }
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        warn!(
            suite = report.suite,
            failed = report.failures().count(),
            "suite finished with failures"
        );
        ExitCode::FAILURE
    }
}

async fn run_smoke(props: &ServiceProperties) -> ExitCode {
    let store = ObjectStore::connect(props, &props.bucket_for_smoke_test);
    let suite = SmokeSuite::new(store, &props.folder_for_smoke_test).create_bucket(props.create_bucket);
    finish_suite(&suite.run().await)
}

async fn run_limits(props: &ServiceProperties, args: &LimitsArgs) -> Result<ExitCode> {
    let probe = MetadataProbe::builder()
        .start(args.start)
        .step(args.step)
        .max_pairs(args.max_pairs)
        .value_len(args.value_len)
        .build();
    probe.validate().context("invalid metadata probe")?;

    let store = ObjectStore::connect(props, &props.bucket_for_smoke_test);
    let suite = LimitSuite::new(store, &props.folder_for_smoke_test, probe);
    Ok(finish_suite(&suite.run().await))
}

async fn run_presign(props: &ServiceProperties, args: &PresignArgs) -> ExitCode {
    let store = ObjectStore::connect(props, &props.bucket_for_load_test);
    let suite = PresignSuite::new(store, &props.folder_for_load_test)
        .expires_in(Duration::from_secs(args.expires))
        .limit(args.limit);
    finish_suite(&suite.run().await)
}

async fn run_load(props: &ServiceProperties, args: LoadArgs) -> Result<ExitCode> {
    let bucket = args.bucket.unwrap_or_else(|| props.bucket_for_load_test.clone());
    let root = args.root.unwrap_or_else(|| props.folder_for_load_test.clone());
    let config = LoadConfig::builder()
        .threads(args.threads)
        .containers(args.containers)
        .documents_per_container(args.docs)
        .root(root)
        .generator(args.generator)
        .json_sidecar(args.json_sidecar)
        .build();

    let store = ObjectStore::connect(props, bucket);
    let load = LoadTest::new(store, config);

    let stopper = load.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop();
        }
    });

    let report = load.run().await.context("load test failed")?;
    info!(
        containers_requested = report.containers_requested,
        containers_created = report.containers_created,
        documents_created = report.documents_created,
        documents_failed = report.documents_failed,
        stopped = report.stopped,
        elapsed = ?report.elapsed,
        "load test finished"
    );
    for timer in &report.timers {
        info!("{timer}");
    }
    if let Some(error) = &report.last_error {
        warn!(%error, "last upload error");
    }

    Ok(if report.documents_failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_count(props: &ServiceProperties, args: CountArgs) -> Result<ExitCode> {
    let bucket = args.bucket.unwrap_or_else(|| props.bucket_for_smoke_test.clone());
    let store = ObjectStore::connect(props, bucket);
    let result = count_objects(&store, args.scheme, &args.prefix, args.page_size, args.cap)
        .await
        .context("listing failed")?;
    info!(
        count = result.visited,
        fetches = result.fetches,
        outcome = ?result.outcome,
        "objects counted"
    );
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let props = ServiceProperties::load(cli.config.as_deref())
        .context("cannot load service properties")?;
    init_tracing(&props.log_level)?;

    info!(
        endpoint = props.service_endpoint.as_deref().unwrap_or("<aws>"),
        region = %props.region,
        version = env!("CARGO_PKG_VERSION"),
        "starting s3probe",
    );

    match cli.command {
        Command::Smoke => Ok(run_smoke(&props).await),
        Command::Limits(args) => run_limits(&props, &args).await,
        Command::Presign(args) => Ok(run_presign(&props, &args).await),
        Command::Load(args) => run_load(&props, args).await,
        Command::Count(args) => run_count(&props, args).await,
    }
}
