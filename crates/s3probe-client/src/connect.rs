//! S3 client construction from [`ServiceProperties`].

use aws_credential_types::Credentials;
use aws_sdk_s3::config::{
    BehaviorVersion, Region, RequestChecksumCalculation, ResponseChecksumValidation,
};
use s3probe_core::ServiceProperties;
use tracing::debug;

/// Build an S3 client for the configured backend.
///
/// Uses static credentials, path-style addressing and checksums only where an
/// operation requires them, which is what MinIO and Swift gateways accept.
#[must_use]
pub fn build_client(props: &ServiceProperties) -> aws_sdk_s3::Client {
    let creds = Credentials::new(
        props.username.clone(),
        props.password.clone(),
        None,
        None,
        "s3probe",
    );

    let mut builder = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(props.region.clone()))
        .credentials_provider(creds)
        .force_path_style(true)
        .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
        .response_checksum_validation(ResponseChecksumValidation::WhenRequired);

    if let Some(endpoint) = &props.service_endpoint {
        builder = builder.endpoint_url(endpoint);
    }

    debug!(
        endpoint = props.service_endpoint.as_deref().unwrap_or("<aws>"),
        region = %props.region,
        "built S3 client"
    );
    aws_sdk_s3::Client::from_conf(builder.build())
}
