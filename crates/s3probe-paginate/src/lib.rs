//! Backend-agnostic paginated listing traversal.
//!
//! Object stores hand out listings one page at a time, each backend with its
//! own token scheme. This crate reduces all of them to one capability,
//! [`PageSource::fetch_page`], and drives it with a single [`Traverser`].
//!
//! # Architecture
//!
//! ```text
//!  consumer (run / next_item / stream)
//!        |
//!        v
//!   Traverser  (cap, cancellation, state machine)
//!        |
//!        v
//!   PageSource (marker / continuation / version adapters, in-memory mock)
//! ```

mod model;
mod source;
mod traverser;

pub use model::{ListingRequest, ObjectDescriptor, Page, PageToken};
pub use source::{MemoryPageSource, PageSource};
pub use traverser::{TraversalOutcome, TraversalResult, TraversalState, Traverser};
