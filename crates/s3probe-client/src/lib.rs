//! S3 backend access for s3probe.
//!
//! - [`build_client`] turns [`s3probe_core::ServiceProperties`] into an
//!   `aws_sdk_s3::Client` (static credentials, path-style, custom endpoint).
//! - [`ObjectStore`] is a bucket-scoped facade over the operations the smoke,
//!   limit, presign and load drivers need. SDK errors come back as
//!   [`s3probe_core::BackendRequestFailure`].
//! - [`MarkerSource`], [`ContinuationSource`] and [`VersionSource`] adapt the
//!   three S3 listing schemes to [`s3probe_paginate::PageSource`].

mod connect;
mod error;
mod sources;
mod store;
mod time;

pub use connect::build_client;
pub use sources::{ContinuationSource, MarkerSource, VersionSource};
pub use store::{
    AclGrant, AclSummary, DELETE_BATCH_SIZE, FOLDER_CONTENT_TYPE, ObjectHead, ObjectStore,
    PutOptions, PutOutcome, StoredObject, VersioningState,
};
