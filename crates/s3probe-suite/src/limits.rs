//! Backend limit probes: user-metadata size and listing pagination.

use std::collections::HashMap;
use std::ops::ControlFlow;

use bytes::Bytes;
use s3probe_client::{ObjectStore, PutOptions};
use s3probe_core::keys::{folder_prefix, join_key};
use s3probe_core::{ProbeError, ProbeResult};
use s3probe_paginate::{PageToken, Traverser};
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use crate::report::SuiteReport;
use crate::smoke::SAMPLE_TEXT;

const PAGE_SIZE: u32 = 100;
const PROBE_OBJECT: &str = "test.txt";
const MARKER_SUFFIX: &str = "test-000008";
const VALUE_PATTERN: &str = "0123456789";

/// Parameters of the user-metadata size probe.
///
/// The probe writes one object with `start` metadata pairs, then `start +
/// step`, and so on up to `max_pairs`, until the backend rejects the write or
/// returns different metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct MetadataProbe {
    /// Pair count of the first attempt.
    #[builder(default = 8)]
    pub start: usize,
    /// Pair count increment between attempts.
    #[builder(default = 8)]
    pub step: usize,
    /// Largest pair count to try.
    #[builder(default = 64)]
    pub max_pairs: usize,
    /// Length of every metadata value.
    #[builder(default = 100)]
    pub value_len: usize,
}

impl Default for MetadataProbe {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl MetadataProbe {
    /// Reject parameters that would never probe anything.
    pub fn validate(&self) -> ProbeResult<()> {
        if self.start == 0 || self.step == 0 {
            return Err(ProbeError::Config(
                "metadata probe start and step must be greater than 0".to_owned(),
            ));
        }
        if self.start > self.max_pairs {
            return Err(ProbeError::Config(format!(
                "metadata probe start {} exceeds max_pairs {}",
                self.start, self.max_pairs
            )));
        }
        Ok(())
    }

    /// Pair counts in the order they are tried.
    pub fn counts(&self) -> impl Iterator<Item = usize> + use<> {
        (self.start..=self.max_pairs).step_by(self.step.max(1))
    }

    /// `count` metadata pairs, `userdata-0000000000` onwards.
    #[must_use]
    pub fn pairs(&self, count: usize) -> HashMap<String, String> {
        let value: String = VALUE_PATTERN.chars().cycle().take(self.value_len).collect();
        (0..count)
            .map(|i| (format!("userdata-{i:010}"), value.clone()))
            .collect()
    }

    /// Bytes of key and value text for `count` pairs.
    #[must_use]
    pub fn payload_bytes(&self, count: usize) -> usize {
        count * ("userdata-".len() + 10 + self.value_len)
    }
}

/// What the metadata probe found out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    /// Largest pair count that round-tripped unchanged.
    pub largest_accepted: Option<usize>,
    /// First pair count that failed, with the reason.
    pub first_rejected: Option<(usize, String)>,
}

impl ProbeSummary {
    /// Fail when not even the smallest pair count was accepted.
    pub fn into_result(self) -> ProbeResult<Self> {
        if self.largest_accepted.is_some() {
            return Ok(self);
        }
        let reason = self
            .first_rejected
            .map(|(n, e)| format!("{n} pairs: {e}"))
            .unwrap_or_default();
        Err(ProbeError::Verification(format!(
            "no metadata size accepted ({reason})"
        )))
    }
}

/// Describe the first difference between written and read metadata.
#[must_use]
pub fn metadata_mismatch(
    sent: &HashMap<String, String>,
    received: &HashMap<String, String>,
) -> Option<String> {
    let mut keys: Vec<&String> = sent.keys().collect();
    keys.sort();
    for key in keys {
        match received.get(key) {
            None => return Some(format!("{key} missing")),
            Some(value) if *value != sent[key] => {
                return Some(format!("{key} truncated to {} bytes", value.len()));
            }
            Some(_) => {}
        }
    }
    (received.len() != sent.len())
        .then(|| format!("{} pairs sent, {} received", sent.len(), received.len()))
}

/// Metadata and pagination probes below one folder.
#[derive(Debug, Clone)]
pub struct LimitSuite {
    store: ObjectStore,
    folder: String,
    probe: MetadataProbe,
}

impl LimitSuite {
    /// Suite working in `folder` of `store`'s bucket.
    pub fn new(store: ObjectStore, folder: &str, probe: MetadataProbe) -> Self {
        Self {
            store,
            folder: folder_prefix(folder.trim_end_matches('/')),
            probe,
        }
    }

    /// Run the probes and report their outcomes.
    pub async fn run(&self) -> SuiteReport {
        let mut report = SuiteReport::new("limits");
        if report
            .step("init test container", self.init_container())
            .await
            .is_none()
        {
            return report;
        }
        report.step("metadata size", self.probe_metadata()).await;
        report
            .step("paging with continuation tokens", self.page_with_continuation())
            .await;
        report.step("paging with marker", self.page_with_marker()).await;
        report
    }

    async fn init_container(&self) -> ProbeResult<()> {
        if !self.store.bucket_exists().await? {
            return Err(ProbeError::Config(format!(
                "bucket '{}' does not exist",
                self.store.bucket()
            )));
        }
        let request = self.store.listing(&self.folder, 1)?;
        let found = Traverser::new(self.store.marker_source(), request)
            .with_item_cap(Some(1))
            .count()
            .await?
            .visited
            > 0;
        if found {
            info!(folder = %self.folder, "test container found");
        } else {
            self.store.put_folder(&self.folder, HashMap::new()).await?;
            info!(folder = %self.folder, "test container created");
        }
        Ok(())
    }

    async fn probe_metadata(&self) -> ProbeResult<ProbeSummary> {
        self.probe.validate()?;
        let path = join_key([self.folder.as_str(), PROBE_OBJECT]);
        let mut summary = ProbeSummary::default();

        for count in self.probe.counts() {
            let sent = self.probe.pairs(count);
            debug!(pairs = count, bytes = self.probe.payload_bytes(count), "probing metadata size");
            match self.round_trip(&path, sent).await {
                Ok(()) => summary.largest_accepted = Some(count),
                Err(e) => {
                    warn!(pairs = count, error = %e, "metadata rejected");
                    summary.first_rejected = Some((count, e.to_string()));
                    break;
                }
            }
        }

        info!(
            largest_accepted = ?summary.largest_accepted,
            first_rejected = ?summary.first_rejected.as_ref().map(|(n, _)| n),
            "metadata size probe finished"
        );

        // A write whose metadata came back altered still stored the object.
        let removed = self.store.delete_object(&path).await;
        let summary = summary.into_result()?;
        removed?;
        Ok(summary)
    }

    async fn round_trip(&self, path: &str, sent: HashMap<String, String>) -> ProbeResult<()> {
        let options = PutOptions::builder()
            .content_type("text/plain")
            .metadata(sent)
            .build();
        self.store
            .put_object(path, Bytes::from_static(SAMPLE_TEXT.as_bytes()), &options)
            .await?;
        let head = self.store.head_object(path, None).await?;
        match metadata_mismatch(&options.metadata, &head.metadata) {
            Some(diff) => Err(ProbeError::Verification(diff)),
            None => Ok(()),
        }
    }

    async fn page_with_continuation(&self) -> ProbeResult<()> {
        let request = self.store.listing(&self.folder, PAGE_SIZE)?;
        let mut traverser = Traverser::new(self.store.continuation_source(), request);
        let mut fetches = 0;
        while let Some(item) = traverser.next_item().await? {
            if traverser.fetches() != fetches {
                fetches = traverser.fetches();
                info!(page = fetches, first_key = %item.key, "page");
            }
        }
        info!(visited = traverser.visited(), fetches, "continuation paging done");
        Ok(())
    }

    async fn page_with_marker(&self) -> ProbeResult<()> {
        let marker = self.store.key(&format!("{}{MARKER_SUFFIX}", self.folder));
        let request = self
            .store
            .listing(&self.folder, PAGE_SIZE)?
            .starting_at(PageToken::new(marker.clone()));
        let result = Traverser::new(self.store.marker_source(), request)
            .run(|item| {
                debug!(key = %item.key, size = item.size, "listed");
                ControlFlow::Continue(())
            })
            .await?;
        info!(%marker, visited = result.visited, fetches = result.fetches, "marker paging done");
        Ok(())
    }
}
