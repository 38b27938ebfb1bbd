//! Listing data model: descriptors, tokens, requests and pages.

use std::fmt;

use chrono::{DateTime, Utc};
use s3probe_core::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};

/// Snapshot of one object (or object version) as returned by a listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    /// Object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time reported by the backend.
    pub last_modified: DateTime<Utc>,
    /// Version ID, present for version listings.
    pub version_id: Option<String>,
    /// Owner display name or ID, when the backend reports it.
    pub owner: Option<String>,
    /// Entity tag.
    pub e_tag: Option<String>,
    /// Whether this is the current version (version listings only).
    pub is_latest: Option<bool>,
}

impl ObjectDescriptor {
    /// Create a descriptor with only the mandatory fields set.
    pub fn new(key: impl Into<String>, size: u64, last_modified: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified,
            version_id: None,
            owner: None,
            e_tag: None,
            is_latest: None,
        }
    }
}

/// Opaque continuation marker handed out by a backend.
///
/// Callers never interpret its contents; adapters decide what it encodes
/// (a marker key, a continuation token, a key/version pair).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageToken(String);

impl PageToken {
    /// Wrap a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters of one listing, shared by every page fetch.
///
/// The traverser replaces `start_token` with each returned token; everything
/// else stays fixed for the lifetime of the traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    /// Bucket to list.
    pub bucket: String,
    /// Key prefix to restrict the listing to.
    pub prefix: String,
    /// Maximum number of descriptors per page (always > 0).
    pub page_size: u32,
    /// Where to resume; `None` starts at the beginning.
    pub start_token: Option<PageToken>,
}

impl ListingRequest {
    /// Build a request starting at the beginning of the listing.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] when `page_size` is zero.
    pub fn new(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        page_size: u32,
    ) -> ProbeResult<Self> {
        if page_size == 0 {
            return Err(ProbeError::Config("page size must be greater than 0".to_owned()));
        }
        Ok(Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            page_size,
            start_token: None,
        })
    }

    /// Resume from the given token instead of the beginning.
    #[must_use]
    pub fn starting_at(mut self, token: PageToken) -> Self {
        self.start_token = Some(token);
        self
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Descriptors in backend order.
    pub items: Vec<ObjectDescriptor>,
    /// Token for the following page, if the backend returned one.
    pub next_token: Option<PageToken>,
    /// The backend reported this as the final page.
    pub is_last: bool,
}

impl Page {
    /// A final page.
    #[must_use]
    pub fn last(items: Vec<ObjectDescriptor>) -> Self {
        Self {
            items,
            next_token: None,
            is_last: true,
        }
    }

    /// A page followed by more pages.
    #[must_use]
    pub fn more(items: Vec<ObjectDescriptor>, next_token: PageToken) -> Self {
        Self {
            items,
            next_token: Some(next_token),
            is_last: false,
        }
    }

    /// Whether the traversal must stop after this page.
    ///
    /// A page without a continuation token is final even when the backend
    /// forgot to flag it; resuming without a token would restart the listing.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.is_last || self.next_token.is_none()
    }
}
