//! Shared building blocks for the s3probe smoke and load testers.
//!
//! This crate holds what every other s3probe crate needs: the backend
//! [`ServiceProperties`], the error taxonomy ([`ProbeError`],
//! [`BackendRequestFailure`], [`PaginationFailure`]), object key helpers and
//! the [`OperationTimer`] used to report per-operation latencies.

mod config;
mod error;
pub mod keys;
mod timer;

pub use config::ServiceProperties;
pub use error::{BackendRequestFailure, PaginationFailure, ProbeError, ProbeResult};
pub use timer::{OperationTimer, TimerSnapshot};
