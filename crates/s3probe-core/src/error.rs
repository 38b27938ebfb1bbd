//! Error taxonomy for s3probe.
//!
//! Three failure classes matter to callers:
//!
//! - [`BackendRequestFailure`]: the object store rejected or could not complete
//!   a request (permission, not found, throttling, network).
//! - [`PaginationFailure`]: a backend failure hit in the middle of a listing
//!   traversal, together with the progress made before it.
//! - [`ProbeError::Config`]: missing or malformed endpoint/credentials, fatal at
//!   startup.

use std::fmt;

/// A request to the storage backend failed.
///
/// Carries whatever the backend reported: the HTTP status when a response was
/// received, the service error code (e.g. `NoSuchKey`) and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRequestFailure {
    /// Name of the failed operation (e.g. `"ListObjectsV2"`).
    pub operation: &'static str,
    /// HTTP status code, if the backend answered at all.
    pub status: Option<u16>,
    /// Service error code, if present in the response body.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl BackendRequestFailure {
    /// Create a failure without status or code (transport-level problems).
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// Attach an HTTP status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach a service error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Whether the backend reported the addressed resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
            || matches!(
                self.code.as_deref(),
                Some("NoSuchKey" | "NoSuchBucket" | "NotFound" | "NoSuchTagSet" | "NoSuchTagSetError")
            )
    }
}

impl fmt::Display for BackendRequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed", self.operation)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {status})")?;
        }
        if let Some(code) = &self.code {
            write!(f, " [{code}]")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for BackendRequestFailure {}

/// A listing traversal aborted because a page fetch failed.
///
/// Items visited before the failure were already handed to the consumer; the
/// counts here say how far the traversal got.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("pagination failed after {visited} items in {fetches} pages: {source}")]
pub struct PaginationFailure {
    /// Items visited before the failing fetch.
    pub visited: u64,
    /// Pages fetched successfully before the failing fetch.
    pub fetches: u64,
    /// The backend failure that stopped the traversal.
    #[source]
    pub source: BackendRequestFailure,
}

/// Top-level error type for s3probe operations.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Malformed or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The storage backend rejected a request.
    #[error(transparent)]
    Backend(#[from] BackendRequestFailure),

    /// A listing traversal failed part-way.
    #[error(transparent)]
    Pagination(#[from] PaginationFailure),

    /// A verification step found data that differs from what was written.
    #[error("verification failed: {0}")]
    Verification(String),

    /// A generated document could not be rendered.
    #[error("render error: {0}")]
    Render(String),

    /// JSON encoding or decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProbeError {
    /// HTTP status of the underlying backend failure, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend(failure) => failure.status,
            Self::Pagination(failure) => failure.source.status,
            _ => None,
        }
    }
}

/// Convenience result type for s3probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_format_backend_failure_with_status_and_code() {
        let failure = BackendRequestFailure::new("GetObject", "The specified key does not exist")
            .with_status(404)
            .with_code("NoSuchKey");

        assert_eq!(
            failure.to_string(),
            "GetObject failed (HTTP 404) [NoSuchKey]: The specified key does not exist"
        );
        assert!(failure.is_not_found());
    }

    #[test]
    fn test_should_format_transport_failure_without_status() {
        let failure = BackendRequestFailure::new("ListBuckets", "connection refused");
        assert_eq!(failure.to_string(), "ListBuckets failed: connection refused");
        assert!(!failure.is_not_found());
    }

    #[test]
    fn test_should_report_partial_progress_in_pagination_failure() {
        let err = PaginationFailure {
            visited: 200,
            fetches: 2,
            source: BackendRequestFailure::new("ListObjectsV2", "throttled").with_status(503),
        };
        let msg = err.to_string();
        assert!(msg.contains("after 200 items in 2 pages"));

        let probe: ProbeError = err.into();
        assert_eq!(probe.status(), Some(503));
    }

    #[test]
    fn test_should_report_no_status_for_local_failures() {
        let json = serde_json::from_str::<serde_json::Value>("{").expect_err("truncated");
        let err = ProbeError::from(json);
        assert!(err.to_string().starts_with("JSON error: "));
        assert_eq!(err.status(), None);

        let err = ProbeError::Config("empty region".into());
        assert_eq!(err.to_string(), "configuration error: empty region");
        assert_eq!(err.status(), None);
    }
}
