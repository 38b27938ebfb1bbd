//! Test suites run against a live S3-compatible backend.
//!
//! Each suite is a sequence of named steps recorded in a [`SuiteReport`]. A
//! failing step is logged and recorded; the suite moves on to the next one.
//!
//! - [`SmokeSuite`]: bucket settings, object CRUD, presigned access, versions
//!   and paged listings.
//! - [`LimitSuite`]: user-metadata size probe and pagination from a marker.
//! - [`PresignSuite`]: signing latency over a load-test folder.

mod limits;
mod listing;
mod presign;
mod report;
mod smoke;

pub use limits::{LimitSuite, MetadataProbe, ProbeSummary, metadata_mismatch};
pub use listing::{ListingScheme, collect_keys, count_objects};
pub use presign::{PresignSuite, PresignSummary, is_pdf};
pub use report::{StepReport, StepStatus, SuiteReport};
pub use smoke::{
    PRESIGN_EXPIRY, SAMPLE_TEXT, SmokeKeys, SmokeSuite, document_metadata, expect_metadata,
    expect_sample_body,
};
