//! Paginated collection traversal.
//!
//! A [`Traverser`] walks every page a [`PageSource`] hands out, one fetch at a
//! time, and yields the descriptors in backend order. It keeps at most one page
//! in memory and stops on the first of:
//!
//! - the backend reporting the final page,
//! - the visited count reaching the item cap,
//! - the consumer asking to stop,
//! - a failed fetch (reported as [`PaginationFailure`]).
//!
//! ```text
//! NotStarted --fetch--> Fetching --token--> Fetching ...
//!                          |--final page--> Done
//!                          |--cap/cancel--> StoppedEarly
//!                          '--error-------> Failed
//! ```

use std::collections::VecDeque;
use std::ops::ControlFlow;

use futures::Stream;
use s3probe_core::PaginationFailure;
use tracing::{debug, warn};

use crate::model::{ListingRequest, ObjectDescriptor};
use crate::source::PageSource;

/// Lifecycle of a traversal. `Done`, `StoppedEarly` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalState {
    /// No page requested yet.
    NotStarted,
    /// At least one page fetched, more may follow.
    Fetching,
    /// The backend reported no further pages and every item was visited.
    Done,
    /// Stopped by the item cap or by the consumer.
    StoppedEarly,
    /// A page fetch failed.
    Failed,
}

impl TraversalState {
    /// Whether no further fetches or items can happen.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::StoppedEarly | Self::Failed)
    }
}

/// Why a finished traversal stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOutcome {
    /// Natural exhaustion of the listing.
    Completed,
    /// The item cap was reached before the listing was exhausted.
    CapReached,
    /// The consumer asked to stop.
    Cancelled,
}

/// Summary of a finished traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalResult {
    /// Items handed to the consumer.
    pub visited: u64,
    /// Pages fetched.
    pub fetches: u64,
    /// Why the traversal stopped.
    pub outcome: TraversalOutcome,
}

impl TraversalResult {
    /// True when the traversal stopped before the listing was exhausted.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.outcome != TraversalOutcome::Completed
    }
}

/// Lazily walks all pages of a listing.
///
/// ```
/// # tokio_test::block_on(async {
/// use std::ops::ControlFlow;
/// use s3probe_paginate::{ListingRequest, MemoryPageSource, Traverser};
///
/// let keys: Vec<String> = (0..250).map(|i| format!("x/{i:04}")).collect();
/// let source = MemoryPageSource::with_keys(keys.iter().map(String::as_str));
/// let request = ListingRequest::new("bucket", "x/", 100).unwrap();
///
/// let result = Traverser::new(source, request)
///     .run(|_| ControlFlow::Continue(()))
///     .await
///     .unwrap();
/// assert_eq!(result.visited, 250);
/// assert_eq!(result.fetches, 3);
/// assert!(!result.is_truncated());
/// # });
/// ```
#[derive(Debug)]
pub struct Traverser<S> {
    source: S,
    request: ListingRequest,
    item_cap: Option<u64>,
    page: VecDeque<ObjectDescriptor>,
    last_page_seen: bool,
    state: TraversalState,
    outcome: Option<TraversalOutcome>,
    visited: u64,
    fetches: u64,
}

impl<S: PageSource> Traverser<S> {
    /// Create a traversal over `source`, starting at `request.start_token`.
    pub fn new(source: S, request: ListingRequest) -> Self {
        Self {
            source,
            request,
            item_cap: None,
            page: VecDeque::new(),
            last_page_seen: false,
            state: TraversalState::NotStarted,
            outcome: None,
            visited: 0,
            fetches: 0,
        }
    }

    /// Stop after `cap` items. `None` means unlimited.
    #[must_use]
    pub fn with_item_cap(mut self, cap: Option<u64>) -> Self {
        self.item_cap = cap;
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TraversalState {
        self.state
    }

    /// Items handed out so far.
    #[must_use]
    pub fn visited(&self) -> u64 {
        self.visited
    }

    /// Pages fetched so far.
    #[must_use]
    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    /// The listing parameters, including the token of the next page.
    #[must_use]
    pub fn request(&self) -> &ListingRequest {
        &self.request
    }

    /// Summary once the traversal reached `Done` or `StoppedEarly`.
    #[must_use]
    pub fn result(&self) -> Option<TraversalResult> {
        self.outcome.map(|outcome| TraversalResult {
            visited: self.visited,
            fetches: self.fetches,
            outcome,
        })
    }

    /// Stop the traversal; later calls yield nothing.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.finish(TraversalOutcome::Cancelled);
        }
    }

    /// Next descriptor, fetching a new page when the current one is used up.
    ///
    /// Returns `Ok(None)` once the traversal is finished. After an error the
    /// traversal is `Failed` and every later call returns `Ok(None)`.
    pub async fn next_item(&mut self) -> Result<Option<ObjectDescriptor>, PaginationFailure> {
        loop {
            if self.state.is_terminal() {
                return Ok(None);
            }

            if self.item_cap.is_some_and(|cap| self.visited >= cap) {
                let exhausted = self.page.is_empty() && self.last_page_seen;
                self.finish(if exhausted {
                    TraversalOutcome::Completed
                } else {
                    TraversalOutcome::CapReached
                });
                return Ok(None);
            }

            if let Some(item) = self.page.pop_front() {
                self.visited += 1;
                return Ok(Some(item));
            }

            if self.last_page_seen {
                self.finish(TraversalOutcome::Completed);
                return Ok(None);
            }

            self.fetch_next_page().await?;
        }
    }

    /// Visit every descriptor with `on_item` until the listing ends, the cap
    /// is hit, or `on_item` breaks.
    pub async fn run<F>(mut self, mut on_item: F) -> Result<TraversalResult, PaginationFailure>
    where
        F: FnMut(ObjectDescriptor) -> ControlFlow<()>,
    {
        while let Some(item) = self.next_item().await? {
            if on_item(item).is_break() {
                self.cancel();
                break;
            }
        }
        Ok(self.summary())
    }

    /// Count the descriptors without looking at them.
    pub async fn count(self) -> Result<TraversalResult, PaginationFailure> {
        self.run(|_| ControlFlow::Continue(())).await
    }

    /// Turn the traversal into a stream of descriptors.
    ///
    /// A fetch failure is yielded once as `Err`, after which the stream ends.
    /// Dropping the stream cancels the traversal. The stream is not `Unpin`;
    /// pin it (e.g. with [`std::pin::pin!`]) before polling.
    pub fn into_stream(self) -> impl Stream<Item = Result<ObjectDescriptor, PaginationFailure>> {
        futures::stream::unfold(self, |mut traverser| async move {
            match traverser.next_item().await {
                Ok(Some(item)) => Some((Ok(item), traverser)),
                Ok(None) => None,
                Err(failure) => Some((Err(failure), traverser)),
            }
        })
    }

    fn summary(&self) -> TraversalResult {
        TraversalResult {
            visited: self.visited,
            fetches: self.fetches,
            outcome: self.outcome.unwrap_or(TraversalOutcome::Completed),
        }
    }

    fn finish(&mut self, outcome: TraversalOutcome) {
        self.state = match outcome {
            TraversalOutcome::Completed => TraversalState::Done,
            TraversalOutcome::CapReached | TraversalOutcome::Cancelled => {
                TraversalState::StoppedEarly
            }
        };
        self.outcome = Some(outcome);
        self.page.clear();
        debug!(
            bucket = %self.request.bucket,
            prefix = %self.request.prefix,
            visited = self.visited,
            fetches = self.fetches,
            ?outcome,
            "traversal finished"
        );
    }

    async fn fetch_next_page(&mut self) -> Result<(), PaginationFailure> {
        self.state = TraversalState::Fetching;

        let page = match self.source.fetch_page(&self.request).await {
            Ok(page) => page,
            Err(source) => {
                self.state = TraversalState::Failed;
                warn!(
                    bucket = %self.request.bucket,
                    prefix = %self.request.prefix,
                    visited = self.visited,
                    fetches = self.fetches,
                    error = %source,
                    "page fetch failed, aborting traversal"
                );
                return Err(PaginationFailure {
                    visited: self.visited,
                    fetches: self.fetches,
                    source,
                });
            }
        };

        self.fetches += 1;
        if !page.is_last && page.next_token.is_none() {
            warn!(
                bucket = %self.request.bucket,
                fetch = self.fetches,
                "backend reported more pages without a token, treating page as final"
            );
        }

        let is_final = page.is_final();
        debug!(
            bucket = %self.request.bucket,
            prefix = %self.request.prefix,
            fetch = self.fetches,
            items = page.items.len(),
            is_final,
            "fetched page"
        );

        self.page = page.items.into();
        if is_final {
            self.last_page_seen = true;
        } else {
            self.request.start_token = page.next_token;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::pin::pin;

    use futures::StreamExt;
    use s3probe_core::BackendRequestFailure;

    use super::*;
    use crate::model::{Page, PageToken};
    use crate::source::MemoryPageSource;

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("x/{i:05}")).collect()
    }

    fn source(n: usize) -> MemoryPageSource {
        let keys = keys(n);
        MemoryPageSource::with_keys(keys.iter().map(String::as_str))
    }

    fn request(page_size: u32) -> ListingRequest {
        ListingRequest::new("bucket", "x/", page_size).expect("valid request")
    }

    async fn visit_all(
        traverser: Traverser<MemoryPageSource>,
    ) -> (Vec<String>, Result<TraversalResult, PaginationFailure>) {
        let mut seen = Vec::new();
        let result = traverser
            .run(|item| {
                seen.push(item.key);
                ControlFlow::Continue(())
            })
            .await;
        (seen, result)
    }

    #[tokio::test]
    async fn test_should_visit_all_items_in_ceil_pages() {
        for page_size in [1_u32, 2, 3, 7, 100] {
            for total in [0_usize, 1, 5, 14, 100, 101] {
                let (seen, result) = visit_all(Traverser::new(source(total), request(page_size))).await;
                let result = result.expect("no failure");

                assert_eq!(seen, keys(total), "order for P={page_size} M={total}");
                assert_eq!(result.visited, total as u64);
                let expected_fetches = total.div_ceil(page_size as usize).max(1) as u64;
                assert_eq!(result.fetches, expected_fetches, "fetches for P={page_size} M={total}");
                assert_eq!(result.outcome, TraversalOutcome::Completed);
            }
        }
    }

    #[tokio::test]
    async fn test_should_fetch_250_objects_in_three_pages() {
        let mut traverser = Traverser::new(source(250), request(100));
        let mut page_sizes = Vec::new();
        let mut last_fetches = 0;
        let mut in_page = 0;

        while let Some(_item) = traverser.next_item().await.expect("no failure") {
            if traverser.fetches() != last_fetches {
                if in_page > 0 {
                    page_sizes.push(in_page);
                }
                last_fetches = traverser.fetches();
                in_page = 0;
            }
            in_page += 1;
        }
        page_sizes.push(in_page);

        assert_eq!(page_sizes, vec![100, 100, 50]);
        assert_eq!(traverser.state(), TraversalState::Done);
        let result = traverser.result().expect("finished");
        assert_eq!(result.visited, 250);
        assert_eq!(result.fetches, 3);
        assert!(!result.is_truncated());
    }

    #[tokio::test]
    async fn test_should_stop_at_item_cap() {
        let traverser = Traverser::new(source(250), request(100)).with_item_cap(Some(120));
        let (seen, result) = visit_all(traverser).await;
        let result = result.expect("no failure");

        assert_eq!(seen.len(), 120);
        assert_eq!(result.visited, 120);
        assert_eq!(result.fetches, 2);
        assert_eq!(result.outcome, TraversalOutcome::CapReached);
        assert!(result.is_truncated());
    }

    #[tokio::test]
    async fn test_should_not_fetch_beyond_cap_on_page_boundary() {
        let traverser = Traverser::new(source(250), request(100)).with_item_cap(Some(100));
        let (_, result) = visit_all(traverser).await;
        let result = result.expect("no failure");

        assert_eq!(result.visited, 100);
        assert_eq!(result.fetches, 1);
        assert_eq!(result.outcome, TraversalOutcome::CapReached);
    }

    #[tokio::test]
    async fn test_should_report_completed_when_cap_equals_total() {
        let traverser = Traverser::new(source(50), request(100)).with_item_cap(Some(50));
        let (_, result) = visit_all(traverser).await;
        assert_eq!(result.expect("no failure").outcome, TraversalOutcome::Completed);
    }

    #[tokio::test]
    async fn test_should_not_fetch_with_zero_cap() {
        let traverser = Traverser::new(source(10), request(5)).with_item_cap(Some(0));
        let result = traverser.count().await.expect("no failure");

        assert_eq!(result.visited, 0);
        assert_eq!(result.fetches, 0);
        assert_eq!(result.outcome, TraversalOutcome::CapReached);
    }

    #[tokio::test]
    async fn test_should_stop_when_consumer_breaks() {
        let mut seen = 0;
        let result = Traverser::new(source(30), request(10))
            .run(|_| {
                seen += 1;
                if seen == 13 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .await
            .expect("no failure");

        assert_eq!(result.visited, 13);
        assert_eq!(result.fetches, 2);
        assert_eq!(result.outcome, TraversalOutcome::Cancelled);
        assert!(result.is_truncated());
    }

    #[tokio::test]
    async fn test_should_report_partial_count_on_failure() {
        let failing = source(500).failing_on(
            3,
            BackendRequestFailure::new("ListObjectsV2", "slow down")
                .with_status(503)
                .with_code("SlowDown"),
        );
        let mut traverser = Traverser::new(failing, request(100));

        let mut seen = 0;
        let err = loop {
            match traverser.next_item().await {
                Ok(Some(_)) => seen += 1,
                Ok(None) => panic!("traversal should fail"),
                Err(e) => break e,
            }
        };

        assert_eq!(seen, 200);
        assert_eq!(err.visited, 200);
        assert_eq!(err.fetches, 2);
        assert_eq!(err.source.code.as_deref(), Some("SlowDown"));
        assert_eq!(traverser.state(), TraversalState::Failed);

        // Terminal: no further fetches.
        assert!(traverser.next_item().await.expect("terminal").is_none());
        assert_eq!(traverser.source.fetches(), 3);
    }

    #[tokio::test]
    async fn test_should_yield_identical_results_on_rerun() {
        let backend = source(37);
        let (first_keys, first) = visit_all(Traverser::new(backend.clone(), request(10))).await;
        let (second_keys, second) = visit_all(Traverser::new(backend, request(10))).await;

        assert_eq!(first_keys, second_keys);
        assert_eq!(first.expect("first"), second.expect("second"));
    }

    #[tokio::test]
    async fn test_should_resume_from_start_token() {
        let req = request(10).starting_at(PageToken::new("x/00004"));
        let (seen, result) = visit_all(Traverser::new(source(8), req)).await;

        assert_eq!(seen, vec!["x/00005", "x/00006", "x/00007"]);
        assert_eq!(result.expect("no failure").visited, 3);
    }

    #[tokio::test]
    async fn test_should_stream_items_and_end_after_failure() {
        let failing = source(25).failing_on(2, BackendRequestFailure::new("ListObjects", "reset"));
        let mut stream = pin!(Traverser::new(failing, request(10)).into_stream());

        let mut ok = 0;
        let mut errors = 0;
        while let Some(item) = stream.next().await {
            match item {
                Ok(_) => ok += 1,
                Err(e) => {
                    assert_eq!(e.visited, 10);
                    errors += 1;
                }
            }
        }
        assert_eq!(ok, 10);
        assert_eq!(errors, 1);
    }

    /// Reports `is_last = false` but never hands out a token.
    struct TokenlessSource {
        fetches: u64,
    }

    #[async_trait::async_trait]
    impl PageSource for TokenlessSource {
        async fn fetch_page(&mut self, _: &ListingRequest) -> Result<Page, BackendRequestFailure> {
            self.fetches += 1;
            let epoch = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH;
            Ok(Page {
                items: vec![ObjectDescriptor::new("x/a", 1, epoch)],
                next_token: None,
                is_last: false,
            })
        }
    }

    #[tokio::test]
    async fn test_should_treat_missing_token_as_final_page() {
        let result = Traverser::new(TokenlessSource { fetches: 0 }, request(10))
            .count()
            .await
            .expect("no failure");

        assert_eq!(result.visited, 1);
        assert_eq!(result.fetches, 1);
        assert_eq!(result.outcome, TraversalOutcome::Completed);
    }

    /// Hands out empty pages with tokens before the real content.
    struct SparseSource {
        inner: MemoryPageSource,
        empty_pages: u32,
    }

    #[async_trait::async_trait]
    impl PageSource for SparseSource {
        async fn fetch_page(&mut self, req: &ListingRequest) -> Result<Page, BackendRequestFailure> {
            if self.empty_pages > 0 {
                self.empty_pages -= 1;
                return Ok(Page::more(vec![], PageToken::new("")));
            }
            self.inner.fetch_page(req).await
        }
    }

    #[tokio::test]
    async fn test_should_follow_empty_pages_with_tokens() {
        let sparse = SparseSource {
            inner: source(3),
            empty_pages: 2,
        };
        let result = Traverser::new(sparse, request(10)).count().await.expect("no failure");

        assert_eq!(result.visited, 3);
        assert_eq!(result.fetches, 3);
    }

    #[tokio::test]
    async fn test_should_ignore_items_after_cancel() {
        let mut traverser = Traverser::new(source(5), request(10));
        assert_eq!(traverser.state(), TraversalState::NotStarted);

        assert!(traverser.next_item().await.expect("item").is_some());
        assert_eq!(traverser.state(), TraversalState::Fetching);

        traverser.cancel();
        assert_eq!(traverser.state(), TraversalState::StoppedEarly);
        assert!(traverser.next_item().await.expect("terminal").is_none());
        assert_eq!(
            traverser.result().map(|r| r.outcome),
            Some(TraversalOutcome::Cancelled)
        );
    }
}
