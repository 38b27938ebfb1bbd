//! The page-fetching capability and an in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use s3probe_core::BackendRequestFailure;

use crate::model::{ListingRequest, ObjectDescriptor, Page, PageToken};

/// Something that can return one page of a listing at a time.
///
/// Each backend pagination scheme (marker, continuation token, version
/// markers) is a thin adapter implementing this trait. Retry policy, if any,
/// belongs in the implementation; the traverser never retries.
#[async_trait]
pub trait PageSource: Send {
    /// Fetch the page that starts at `request.start_token`.
    async fn fetch_page(&mut self, request: &ListingRequest) -> Result<Page, BackendRequestFailure>;
}

#[async_trait]
impl<S: PageSource + ?Sized> PageSource for Box<S> {
    async fn fetch_page(&mut self, request: &ListingRequest) -> Result<Page, BackendRequestFailure> {
        (**self).fetch_page(request).await
    }
}

/// A sorted in-memory listing, paged by key.
///
/// Tokens are the last key of the previous page, so the source behaves like a
/// marker-based backend. Useful for dry runs and tests.
///
/// ```
/// # tokio_test::block_on(async {
/// use s3probe_paginate::{ListingRequest, MemoryPageSource, PageSource};
///
/// let mut source = MemoryPageSource::with_keys(["x/1", "x/2", "y/1"]);
/// let req = ListingRequest::new("bucket", "x/", 10).unwrap();
/// let page = source.fetch_page(&req).await.unwrap();
/// assert_eq!(page.items.len(), 2);
/// assert!(page.is_last);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryPageSource {
    objects: Vec<ObjectDescriptor>,
    fail_on_fetch: Option<(u64, BackendRequestFailure)>,
    fetches: u64,
}

impl MemoryPageSource {
    /// Build a source from descriptors; they are sorted by key.
    #[must_use]
    pub fn new(mut objects: Vec<ObjectDescriptor>) -> Self {
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Self {
            objects,
            fail_on_fetch: None,
            fetches: 0,
        }
    }

    /// Build a source of empty objects with the given keys.
    pub fn with_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        Self::new(
            keys.into_iter()
                .map(|k| ObjectDescriptor::new(k, 0, epoch))
                .collect(),
        )
    }

    /// Make the `n`-th fetch (1-based) fail with `failure`.
    #[must_use]
    pub fn failing_on(mut self, n: u64, failure: BackendRequestFailure) -> Self {
        self.fail_on_fetch = Some((n, failure));
        self
    }

    /// Number of fetches served so far, failed ones included.
    #[must_use]
    pub fn fetches(&self) -> u64 {
        self.fetches
    }
}

#[async_trait]
impl PageSource for MemoryPageSource {
    async fn fetch_page(&mut self, request: &ListingRequest) -> Result<Page, BackendRequestFailure> {
        self.fetches += 1;
        if let Some((n, failure)) = &self.fail_on_fetch {
            if *n == self.fetches {
                return Err(failure.clone());
            }
        }

        let after = request.start_token.as_ref().map(PageToken::as_str);
        let page_size = request.page_size as usize;

        let mut matching = self
            .objects
            .iter()
            .filter(|o| o.key.starts_with(&request.prefix))
            .filter(|o| after.is_none_or(|marker| o.key.as_str() > marker));

        let items: Vec<ObjectDescriptor> = matching.by_ref().take(page_size).cloned().collect();
        let more = matching.next().is_some();

        Ok(match items.last() {
            Some(last) if more => {
                let token = PageToken::new(last.key.clone());
                Page::more(items, token)
            }
            _ => Page::last(items),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_should_page_by_last_key() {
        let mut source = MemoryPageSource::with_keys(["a", "b", "c"]);
        let mut req = ListingRequest::new("bucket", "", 2).expect("request");

        let first = source.fetch_page(&req).await.expect("page 1");
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_token, Some(PageToken::new("b")));
        assert!(!first.is_last);

        req.start_token = first.next_token;
        let second = source.fetch_page(&req).await.expect("page 2");
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].key, "c");
        assert!(second.is_last);
    }

    #[tokio::test]
    async fn test_should_mark_exactly_full_page_as_last() {
        let mut source = MemoryPageSource::with_keys(["a", "b"]);
        let req = ListingRequest::new("bucket", "", 2).expect("request");

        let page = source.fetch_page(&req).await.expect("page");
        assert_eq!(page.items.len(), 2);
        assert!(page.is_last);
    }

    #[tokio::test]
    async fn test_should_fail_on_configured_fetch() {
        let mut source = MemoryPageSource::with_keys(["a", "b", "c"])
            .failing_on(2, BackendRequestFailure::new("List", "boom").with_status(500));
        let mut req = ListingRequest::new("bucket", "", 1).expect("request");

        let first = source.fetch_page(&req).await.expect("page 1");
        req.start_token = first.next_token;
        let err = source.fetch_page(&req).await.expect_err("page 2 fails");
        assert_eq!(err.status, Some(500));
        assert_eq!(source.fetches(), 2);
    }
}
