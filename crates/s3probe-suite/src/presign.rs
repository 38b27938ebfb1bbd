//! Presigning throughput: sign a GET URL for every PDF below a folder.

use std::pin::pin;
use std::time::Duration;

use futures::StreamExt;
use s3probe_client::ObjectStore;
use s3probe_core::keys::folder_prefix;
use s3probe_core::{OperationTimer, ProbeResult, TimerSnapshot};
use s3probe_paginate::Traverser;
use tracing::{debug, info};

use crate::report::SuiteReport;

const PAGE_SIZE: u32 = 100;

/// Counts and signing latency of one presign run.
#[derive(Debug, Clone)]
pub struct PresignSummary {
    /// URLs created.
    pub signed: u64,
    /// Listed objects that are not PDFs.
    pub skipped: u64,
    /// Signing latency.
    pub signing: TimerSnapshot,
}

/// Whether a key names a rendered document.
#[must_use]
pub fn is_pdf(key: &str) -> bool {
    key.ends_with(".pdf")
}

/// Presign every `.pdf` object below one folder.
#[derive(Debug, Clone)]
pub struct PresignSuite {
    store: ObjectStore,
    folder: String,
    expires_in: Duration,
    limit: Option<u64>,
}

impl PresignSuite {
    /// Suite over `folder` of `store`'s bucket, URLs valid for one minute.
    pub fn new(store: ObjectStore, folder: &str) -> Self {
        Self {
            store,
            folder: folder_prefix(folder),
            expires_in: Duration::from_secs(60),
            limit: None,
        }
    }

    /// Validity of the created URLs.
    #[must_use]
    pub fn expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = expires_in;
        self
    }

    /// Look at no more than `limit` listed objects.
    #[must_use]
    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    /// Run the suite.
    pub async fn run(&self) -> SuiteReport {
        let mut report = SuiteReport::new("presign");
        report.step("presign pdf objects", self.presign_all()).await;
        report
    }

    /// Traverse the folder and sign every PDF, timing each signature.
    pub async fn presign_all(&self) -> ProbeResult<PresignSummary> {
        let timer = OperationTimer::new("signing");
        let request = self.store.listing(&self.folder, PAGE_SIZE)?;
        let mut items = pin!(
            Traverser::new(self.store.continuation_source(), request)
                .with_item_cap(self.limit)
                .into_stream()
        );

        let (mut signed, mut skipped) = (0, 0);
        while let Some(item) = items.next().await {
            let item = item?;
            if !is_pdf(&item.key) {
                skipped += 1;
                continue;
            }
            let path = self.store.path_of(&item.key);
            let url = timer
                .time_async(self.store.presign_get(path, self.expires_in))
                .await?;
            debug!(key = %item.key, %url, "presigned");
            signed += 1;
        }

        let signing = timer.snapshot();
        info!(folder = %self.folder, signed, skipped, %signing, "presigning finished");
        Ok(PresignSummary {
            signed,
            skipped,
            signing,
        })
    }
}
