//! Object-storage service properties.
//!
//! [`ServiceProperties`] describes one backend: endpoint, region, credentials
//! and the bucket/folder names used by the smoke and load tests. Values come
//! from an optional JSON credential file and are then overlaid with
//! environment variables.
//!
//! # Examples
//!
//! ```
//! use s3probe_core::ServiceProperties;
//!
//! let props = ServiceProperties::builder()
//!     .service_endpoint(Some("http://localhost:9000".into()))
//!     .username("minio".into())
//!     .password("minio123".into())
//!     .build();
//! assert!(props.validate().is_ok());
//! assert_eq!(props.bucket_for_smoke_test, "test");
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::error::{ProbeError, ProbeResult};

/// Connection and naming properties for one S3-compatible backend.
///
/// JSON keys are `snake_case` and match the credential files used by the
/// earlier test tooling (`service_endpoint`, `bucket_for_load_test`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct ServiceProperties {
    /// Endpoint URL; `None` means the SDK's regional AWS endpoint.
    #[builder(default)]
    pub service_endpoint: Option<String>,

    /// Signing region.
    #[builder(default = String::from("us-east-1"))]
    pub region: String,

    /// Access key ID.
    #[builder(default)]
    pub username: String,

    /// Secret access key.
    #[builder(default)]
    pub password: String,

    /// Bucket used by the smoke and limit suites.
    #[builder(default = String::from("test"))]
    pub bucket_for_smoke_test: String,

    /// Bucket used by the load generator and the presign suite.
    #[builder(default = String::from("load"))]
    pub bucket_for_load_test: String,

    /// Folder (key prefix) used by the smoke and limit suites.
    #[builder(default = String::from("test"))]
    pub folder_for_smoke_test: String,

    /// Root container (key prefix) used by the load generator.
    #[builder(default = String::from("load"))]
    pub folder_for_load_test: String,

    /// Prepend `<bucket>/` to every object key. Some gateways require it.
    #[builder(default = false)]
    pub prefix_with_bucket_name: bool,

    /// Create the smoke-test bucket when it does not exist.
    #[builder(default = false)]
    pub create_bucket: bool,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for ServiceProperties {
    fn default() -> Self {
        Self {
            service_endpoint: None,
            region: String::from("us-east-1"),
            username: String::new(),
            password: String::new(),
            bucket_for_smoke_test: String::from("test"),
            bucket_for_load_test: String::from("load"),
            folder_for_smoke_test: String::from("test"),
            folder_for_load_test: String::from("load"),
            prefix_with_bucket_name: false,
            create_bucket: false,
            log_level: String::from("info"),
        }
    }
}

impl ServiceProperties {
    /// Read properties from a JSON file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> ProbeResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| ProbeError::Config(format!("invalid JSON in {}: {e}", path.display())))
    }

    /// Load from an optional file, overlay the process environment, validate.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `S3_ENDPOINT_URL` | `service_endpoint` |
    /// | `AWS_REGION` / `DEFAULT_REGION` | `region` |
    /// | `ACCESS_KEY` / `AWS_ACCESS_KEY_ID` | `username` |
    /// | `SECRET_KEY` / `AWS_SECRET_ACCESS_KEY` | `password` |
    /// | `S3_PREFIX_WITH_BUCKET_NAME` | `prefix_with_bucket_name` |
    /// | `S3_CREATE_BUCKET` | `create_bucket` |
    /// | `LOG_LEVEL` | `log_level` |
    pub fn load(path: Option<&Path>) -> ProbeResult<Self> {
        let mut props = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        props.apply_env(|name| std::env::var(name).ok());
        props.validate()?;
        debug!(
            endpoint = props.service_endpoint.as_deref().unwrap_or("<aws>"),
            region = %props.region,
            "loaded service properties"
        );
        Ok(props)
    }

    /// Overlay values from an environment lookup function.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |names: &[&str]| names.iter().find_map(|n| lookup(n));

        if let Some(v) = first(&["S3_ENDPOINT_URL"]) {
            self.service_endpoint = Some(v);
        }
        if let Some(v) = first(&["AWS_REGION", "DEFAULT_REGION"]) {
            self.region = v;
        }
        if let Some(v) = first(&["ACCESS_KEY", "AWS_ACCESS_KEY_ID"]) {
            self.username = v;
        }
        if let Some(v) = first(&["SECRET_KEY", "AWS_SECRET_ACCESS_KEY"]) {
            self.password = v;
        }
        if let Some(v) = first(&["S3_PREFIX_WITH_BUCKET_NAME"]) {
            self.prefix_with_bucket_name = parse_bool(&v);
        }
        if let Some(v) = first(&["S3_CREATE_BUCKET"]) {
            self.create_bucket = parse_bool(&v);
        }
        if let Some(v) = first(&["LOG_LEVEL"]) {
            self.log_level = v;
        }
    }

    /// Reject configurations that cannot possibly authenticate.
    pub fn validate(&self) -> ProbeResult<()> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(ProbeError::Config(
                "missing credentials (username/password)".to_owned(),
            ));
        }
        if self.region.trim().is_empty() {
            return Err(ProbeError::Config("empty region".to_owned()));
        }
        if let Some(endpoint) = &self.service_endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ProbeError::Config(format!(
                    "endpoint must be an http(s) URL: {endpoint}"
                )));
            }
        }
        Ok(())
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
