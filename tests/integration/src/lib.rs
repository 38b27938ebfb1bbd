//! Integration tests for s3probe.
//!
//! These tests require a running S3-compatible server (LocalStack, MinIO,
//! RustStack) at `localhost:4566` or at `S3_ENDPOINT_URL`. They are marked
//! `#[ignore]` so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p s3probe-integration -- --ignored
//! ```

use std::sync::Once;

use bytes::Bytes;
use s3probe_client::{ObjectStore, PutOptions};
use s3probe_core::ServiceProperties;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Service properties for the local server.
///
/// Endpoint and credentials come from the environment, defaulting to
/// `http://localhost:4566` and `test`/`test`.
#[must_use]
pub fn service_properties() -> ServiceProperties {
    init_tracing();

    let mut props = ServiceProperties::builder()
        .service_endpoint(Some("http://localhost:4566".to_owned()))
        .username("test".to_owned())
        .password("test".to_owned())
        .build();
    props.apply_env(|name| std::env::var(name).ok());
    props
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Create a bucket and return a store scoped to it. Caller is responsible
/// for cleanup.
pub async fn create_test_bucket(prefix: &str) -> ObjectStore {
    let store = ObjectStore::connect(&service_properties(), test_bucket_name(prefix));
    store
        .create_bucket()
        .await
        .unwrap_or_else(|e| panic!("failed to create bucket {}: {e}", store.bucket()));
    store
}

/// Upload `count` one-byte objects named `{prefix}{index:04}`.
pub async fn populate(store: &ObjectStore, prefix: &str, count: usize) -> Vec<String> {
    let options = PutOptions::builder().content_type("text/plain").build();
    let mut paths = Vec::with_capacity(count);
    for i in 0..count {
        let path = format!("{prefix}{i:04}");
        store
            .put_object(&path, Bytes::from_static(b"x"), &options)
            .await
            .unwrap_or_else(|e| panic!("put {path}: {e}"));
        paths.push(path);
    }
    paths
}

/// Delete every object version in a bucket, then delete the bucket.
pub async fn cleanup_bucket(store: &ObjectStore) {
    let client = store.client();
    let bucket = store.bucket();

    let mut key_marker: Option<String> = None;
    let mut version_marker: Option<String> = None;
    loop {
        let Ok(resp) = client
            .list_object_versions()
            .bucket(bucket)
            .set_key_marker(key_marker.take())
            .set_version_id_marker(version_marker.take())
            .send()
            .await
        else {
            return; // Bucket may not exist.
        };

        let versions = resp
            .versions()
            .iter()
            .map(|v| (v.key(), v.version_id()))
            .chain(resp.delete_markers().iter().map(|m| (m.key(), m.version_id())));
        for (key, version_id) in versions {
            if let Some(key) = key {
                let _ = client
                    .delete_object()
                    .bucket(bucket)
                    .key(key)
                    .set_version_id(version_id.map(ToOwned::to_owned))
                    .send()
                    .await;
            }
        }

        if resp.is_truncated() == Some(true) {
            key_marker = resp.next_key_marker().map(ToOwned::to_owned);
            version_marker = resp.next_version_id_marker().map(ToOwned::to_owned);
        } else {
            break;
        }
    }

    let _ = client.delete_bucket().bucket(bucket).send().await;
}

mod test_loader;
mod test_store;
mod test_suite;
mod test_traverse;
