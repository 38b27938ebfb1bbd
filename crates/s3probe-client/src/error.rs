//! Conversion of SDK errors into [`BackendRequestFailure`].

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStreamError;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use s3probe_core::BackendRequestFailure;

/// Extract status, service error code and message from an SDK error.
///
/// Service errors keep the backend's own message; transport, timeout and
/// construction failures are described with their full error chain.
pub(crate) fn sdk_failure<E>(operation: &'static str, err: &SdkError<E, HttpResponse>) -> BackendRequestFailure
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let service = err.as_service_error();
    let message = service
        .and_then(ProvideErrorMetadata::message)
        .map_or_else(|| DisplayErrorContext(err).to_string(), ToOwned::to_owned);

    let mut failure = BackendRequestFailure::new(operation, message);
    if let Some(response) = err.raw_response() {
        failure = failure.with_status(response.status().as_u16());
    }
    if let Some(code) = service.and_then(ProvideErrorMetadata::code) {
        failure = failure.with_code(code);
    }
    failure
}

/// A response body could not be read to the end.
pub(crate) fn body_failure(operation: &'static str, err: &ByteStreamError) -> BackendRequestFailure {
    BackendRequestFailure::new(operation, format!("reading response body: {err}"))
}

/// A request could not be assembled (missing required fields).
pub(crate) fn build_failure(
    operation: &'static str,
    err: &impl std::fmt::Display,
) -> BackendRequestFailure {
    BackendRequestFailure::new(operation, format!("invalid request: {err}"))
}
