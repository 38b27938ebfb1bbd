//! Per-run load statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use s3probe_core::OperationTimer;

/// Counters and timers shared by all workers of one load run.
#[derive(Debug)]
pub struct RunStats {
    containers_created: AtomicU64,
    documents_created: AtomicU64,
    documents_failed: AtomicU64,
    last_error: Mutex<Option<String>>,
    /// Time spent generating content and rendering PDFs.
    pub generation: OperationTimer,
    /// Time spent creating containers.
    pub container_creation: OperationTimer,
    /// Time spent uploading documents.
    pub upload: OperationTimer,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            containers_created: AtomicU64::new(0),
            documents_created: AtomicU64::new(0),
            documents_failed: AtomicU64::new(0),
            last_error: Mutex::new(None),
            generation: OperationTimer::new("document_generation"),
            container_creation: OperationTimer::new("container_creation"),
            upload: OperationTimer::new("document_upload"),
        }
    }
}

impl RunStats {
    /// Empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn container_created(&self) {
        self.containers_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn document_created(&self) {
        self.documents_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn document_failed(&self, error: impl Into<String>) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
        self.record_error(error);
    }

    pub(crate) fn record_error(&self, error: impl Into<String>) {
        *self.last_error.lock() = Some(error.into());
    }

    /// Containers created so far.
    #[must_use]
    pub fn containers_created(&self) -> u64 {
        self.containers_created.load(Ordering::Relaxed)
    }

    /// Documents uploaded so far.
    #[must_use]
    pub fn documents_created(&self) -> u64 {
        self.documents_created.load(Ordering::Relaxed)
    }

    /// Documents that failed to upload.
    #[must_use]
    pub fn documents_failed(&self) -> u64 {
        self.documents_failed.load(Ordering::Relaxed)
    }

    /// Most recent error message, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}
