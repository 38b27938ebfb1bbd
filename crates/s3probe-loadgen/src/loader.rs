//! The load run: root check, container creation, then concurrent uploads.
//!
//! ```text
//! check root ──> create containers (sequential, stop at first failure)
//!                      │
//!                      v
//!        one upload loop per container, `threads` at a time
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use s3probe_client::PutOptions;
use s3probe_core::keys::join_key;
use s3probe_core::{ProbeError, ProbeResult, TimerSnapshot};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;

use crate::generator::{DocumentGenerator, GeneratorKind};
use crate::pdf::render_pdf;
use crate::stats::RunStats;
use crate::target::LoadTarget;

/// Parameters of one load run.
#[derive(Debug, Clone, TypedBuilder)]
pub struct LoadConfig {
    /// Upload loops allowed to run at the same time.
    #[builder(default = 1)]
    pub threads: usize,
    /// Containers to create; 0 puts all documents directly under `root`.
    #[builder(default = 0)]
    pub containers: u32,
    /// Documents uploaded into each container.
    #[builder(default = 10)]
    pub documents_per_container: u32,
    /// Existing root folder. Empty means containers are top-level.
    #[builder(default, setter(into))]
    pub root: String,
    /// Which document generator to use.
    #[builder(default)]
    pub generator: GeneratorKind,
    /// Also upload each document's JSON metadata record next to the PDF.
    #[builder(default = false)]
    pub json_sidecar: bool,
}

/// Outcome of a load run.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Containers asked for.
    pub containers_requested: u32,
    /// Containers actually created.
    pub containers_created: u64,
    /// Documents uploaded.
    pub documents_created: u64,
    /// Documents whose generation or upload failed.
    pub documents_failed: u64,
    /// The run was stopped before all documents were written.
    pub stopped: bool,
    /// Wall-clock duration.
    pub elapsed: Duration,
    /// Most recent error message.
    pub last_error: Option<String>,
    /// Generation, container creation and upload timings.
    pub timers: Vec<TimerSnapshot>,
}

#[derive(Debug)]
struct Shared<T> {
    target: T,
    config: LoadConfig,
    generator: Box<dyn DocumentGenerator>,
    stats: RunStats,
    stop: AtomicBool,
}

/// A configured load run against a [`LoadTarget`].
///
/// Cloning is cheap and yields a handle to the same run, e.g. for calling
/// [`LoadTest::stop`] from a signal handler.
#[derive(Debug)]
pub struct LoadTest<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for LoadTest<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: LoadTarget> LoadTest<T> {
    /// Prepare a run using the generator named in `config`.
    pub fn new(target: T, config: LoadConfig) -> Self {
        let generator = config.generator.build();
        Self::with_generator(target, config, generator)
    }

    /// Prepare a run with a custom generator.
    pub fn with_generator(
        target: T,
        config: LoadConfig,
        generator: Box<dyn DocumentGenerator>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                target,
                config,
                generator,
                stats: RunStats::new(),
                stop: AtomicBool::new(false),
            }),
        }
    }

    /// Ask every worker to stop after its current document.
    pub fn stop(&self) {
        if !self.shared.stop.swap(true, Ordering::Relaxed) {
            info!("stop requested, workers finish their current document");
        }
    }

    /// Whether [`LoadTest::stop`] was called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.stop.load(Ordering::Relaxed)
    }

    /// Live statistics of this run.
    #[must_use]
    pub fn stats(&self) -> &RunStats {
        &self.shared.stats
    }

    /// Execute the run.
    ///
    /// Fails only when the configuration is unusable or the root folder is
    /// missing; individual container and document failures are recorded in
    /// the report.
    pub async fn run(&self) -> ProbeResult<LoadReport> {
        let started = Instant::now();
        let config = &self.shared.config;
        if config.threads == 0 {
            return Err(ProbeError::Config("threads must be at least 1".to_owned()));
        }

        info!(
            threads = config.threads,
            containers = config.containers,
            documents = config.documents_per_container,
            root = %config.root,
            generator = %config.generator,
            "starting load run"
        );

        if !config.root.is_empty() && !self.shared.target.has_root(&config.root).await? {
            return Err(ProbeError::Config(format!(
                "no root container \"{}\"",
                config.root
            )));
        }

        let created = self.create_containers().await;
        self.fill_containers(created).await;

        let stats = &self.shared.stats;
        let report = LoadReport {
            containers_requested: config.containers,
            containers_created: stats.containers_created(),
            documents_created: stats.documents_created(),
            documents_failed: stats.documents_failed(),
            stopped: self.is_stopped(),
            elapsed: started.elapsed(),
            last_error: stats.last_error(),
            timers: vec![
                stats.generation.snapshot(),
                stats.container_creation.snapshot(),
                stats.upload.snapshot(),
            ],
        };
        info!(
            containers = report.containers_created,
            documents = report.documents_created,
            failed = report.documents_failed,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "load run finished"
        );
        Ok(report)
    }

    async fn create_containers(&self) -> u32 {
        let shared = &self.shared;
        let mut created = 0;
        for index in 0..shared.config.containers {
            if self.is_stopped() {
                break;
            }
            let name = shared.generator.container_name(index);
            let path = join_key([shared.config.root.as_str(), name.as_str()]);
            let result = shared
                .stats
                .container_creation
                .time_async(shared.target.create_container(&path))
                .await;
            match result {
                Ok(()) => {
                    shared.stats.container_created();
                    created += 1;
                    debug!(container = %path, "created container");
                }
                Err(e) => {
                    warn!(container = %path, error = %e, "container creation failed, not creating more");
                    shared.stats.record_error(e.to_string());
                    break;
                }
            }
        }
        info!(created, requested = shared.config.containers, "containers created");
        created
    }

    async fn fill_containers(&self, created: u32) {
        let containers: Vec<Option<u32>> = if self.shared.config.containers == 0 {
            vec![None]
        } else {
            (0..created).map(Some).collect()
        };

        let permits = Arc::new(Semaphore::new(self.shared.config.threads));
        let mut workers = JoinSet::new();
        for container in containers {
            let shared = Arc::clone(&self.shared);
            let permits = Arc::clone(&permits);
            workers.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return 0;
                };
                shared.fill_container(container).await
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "upload worker aborted");
                self.shared.stats.record_error(format!("upload worker aborted: {e}"));
            }
        }
    }
}

impl<T: LoadTarget> Shared<T> {
    async fn fill_container(&self, container: Option<u32>) -> u64 {
        debug!(?container, "upload loop started");
        let mut created = 0;
        for document in 1..=self.config.documents_per_container {
            if self.stop.load(Ordering::Relaxed) {
                debug!(?container, document, "stop observed");
                break;
            }
            match self.create_document(container, document).await {
                Ok(()) => {
                    self.stats.document_created();
                    created += 1;
                }
                Err(e) => {
                    warn!(?container, document, error = %e, "document failed");
                    self.stats.document_failed(e.to_string());
                }
            }
        }
        debug!(?container, created, "upload loop finished");
        created
    }

    async fn create_document(&self, container: Option<u32>, document: u32) -> ProbeResult<()> {
        let (content, pdf) = self.stats.generation.time(|| {
            let content = self.generator.content(container, document);
            let pdf = render_pdf(&content);
            (content, pdf)
        });
        let pdf = pdf.map_err(|e| ProbeError::Render(e.to_string()))?;

        let container_name = container.map(|c| self.generator.container_name(c));
        let path = self.generator.path_name(container, document);
        let folder = join_key([
            self.config.root.as_str(),
            container_name.as_deref().unwrap_or_default(),
            path.as_str(),
        ]);

        let key = join_key([folder.as_str(), content.title.as_str()]);
        let options = PutOptions::builder()
            .content_type("application/pdf")
            .metadata(content.user_metadata())
            .build();
        self.stats
            .upload
            .time_async(self.target.upload(&key, Bytes::from(pdf), &options))
            .await?;

        if self.config.json_sidecar {
            let stem = content.title.strip_suffix(".pdf").unwrap_or(&content.title);
            let json_key = join_key([folder.as_str(), format!("{stem}.json").as_str()]);
            let options = PutOptions::builder()
                .content_type("application/json")
                .content_encoding("UTF-8")
                .build();
            self.stats
                .upload
                .time_async(self.target.upload(&json_key, Bytes::from(content.to_json()?), &options))
                .await?;
        }
        Ok(())
    }
}
