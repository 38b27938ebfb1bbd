//! Listing helpers shared by the suites and the `count` command.

use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;

use s3probe_client::ObjectStore;
use s3probe_core::{ProbeError, ProbeResult};
use s3probe_paginate::{PageSource, TraversalResult, Traverser};
use tracing::info;

/// Which listing API to page through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingScheme {
    /// `ListObjects` (v1) with key markers.
    Marker,
    /// `ListObjectsV2` with continuation tokens.
    #[default]
    Continuation,
    /// `ListObjectVersions` with key/version markers.
    Versions,
}

impl ListingScheme {
    /// All schemes, in the order the smoke suite exercises them.
    pub const ALL: [Self; 3] = [Self::Continuation, Self::Marker, Self::Versions];

    /// Lower-case name, as accepted by [`FromStr`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::Continuation => "continuation",
            Self::Versions => "versions",
        }
    }

    /// Page source for this scheme over `store`'s client.
    #[must_use]
    pub fn source(self, store: &ObjectStore) -> Box<dyn PageSource> {
        match self {
            Self::Marker => Box::new(store.marker_source()),
            Self::Continuation => Box::new(store.continuation_source()),
            Self::Versions => Box::new(store.version_source()),
        }
    }
}

impl fmt::Display for ListingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingScheme {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "marker" | "v1" => Ok(Self::Marker),
            "continuation" | "v2" => Ok(Self::Continuation),
            "versions" | "version" => Ok(Self::Versions),
            other => Err(ProbeError::Config(format!(
                "unknown listing scheme '{other}' (expected marker, continuation or versions)"
            ))),
        }
    }
}

/// Count the entries under the logical folder `prefix`.
pub async fn count_objects(
    store: &ObjectStore,
    scheme: ListingScheme,
    prefix: &str,
    page_size: u32,
    cap: Option<u64>,
) -> ProbeResult<TraversalResult> {
    let request = store.listing(prefix, page_size)?;
    let result = Traverser::new(scheme.source(store), request)
        .with_item_cap(cap)
        .count()
        .await?;
    info!(
        bucket = store.bucket(),
        prefix,
        scheme = %scheme,
        visited = result.visited,
        fetches = result.fetches,
        truncated = result.is_truncated(),
        "counted objects"
    );
    Ok(result)
}

/// Backend keys under the logical folder `prefix`, at most `cap` of them.
pub async fn collect_keys(
    store: &ObjectStore,
    prefix: &str,
    page_size: u32,
    cap: Option<u64>,
) -> ProbeResult<Vec<String>> {
    let request = store.listing(prefix, page_size)?;
    let mut keys = Vec::new();
    Traverser::new(store.continuation_source(), request)
        .with_item_cap(cap)
        .run(|item| {
            keys.push(item.key);
            ControlFlow::Continue(())
        })
        .await?;
    Ok(keys)
}
