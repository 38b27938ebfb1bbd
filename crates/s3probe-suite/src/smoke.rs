//! End-to-end smoke suite: bucket settings, object CRUD, presigned access,
//! versions and paged listings against one bucket.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use s3probe_client::{ObjectStore, PutOptions, VersioningState};
use s3probe_core::{BackendRequestFailure, ProbeError, ProbeResult};
use s3probe_paginate::{ObjectDescriptor, Traverser};
use tracing::info;

use crate::listing::{ListingScheme, count_objects};
use crate::report::SuiteReport;

/// Text body of the smoke-test objects.
pub const SAMPLE_TEXT: &str = "abcdefghijklmnopqrstuvwxyz\n\
                               01234567890112345678901234\n\
                               !@#$%^&*()-=[]{};':',.<>/?\n\
                               01234567890112345678901234\n\
                               abcdefghijklmnopqrstuvwxyz\n";

/// Validity of the presigned URL fetched by the suite.
pub const PRESIGN_EXPIRY: Duration = Duration::from_secs(60);

const COUNT_CAP: u64 = 10_000;
const PAGE_SIZE: u32 = 100;
const SAMPLE_SIZE: u32 = 10;
const DELETE_PAGE_SIZE: u32 = 1000;
const VERSION_PAGE_SIZE: u32 = 20;

const STATUS_KEY: &str = "document-status";

/// Logical paths of the objects the suite writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeKeys {
    /// Folder placeholder.
    pub folder: String,
    /// Common prefix of the text objects.
    pub prefix: String,
    /// Object written, fetched and versioned.
    pub first: String,
    /// Server-side copy of `first`.
    pub second: String,
}

impl SmokeKeys {
    /// Keys below `folder`, made unique by `now`.
    #[must_use]
    pub fn new(folder: &str, now: DateTime<Utc>) -> Self {
        let folder = folder.trim_end_matches('/');
        let prefix = format!("{folder}/text");
        let stamp = now.timestamp_millis();
        Self {
            folder: format!("{folder}/"),
            first: format!("{prefix}1-{stamp}.txt"),
            second: format!("{prefix}2-{stamp}.txt"),
            prefix,
        }
    }
}

/// User metadata of the text object in the given status.
#[must_use]
pub fn document_metadata(status: &str, now: DateTime<Utc>) -> HashMap<String, String> {
    HashMap::from([
        ("document-type".to_owned(), "rechnung".to_owned()),
        (STATUS_KEY.to_owned(), status.to_owned()),
        ("document-date".to_owned(), now.format("%Y-%m-%d").to_string()),
    ])
}

/// Fail unless `metadata[key] == expected`.
pub fn expect_metadata(
    metadata: &HashMap<String, String>,
    key: &str,
    expected: &str,
) -> ProbeResult<()> {
    match metadata.get(key) {
        Some(value) if value == expected => Ok(()),
        Some(value) => Err(ProbeError::Verification(format!(
            "metadata {key} is '{value}', expected '{expected}'"
        ))),
        None => Err(ProbeError::Verification(format!("metadata {key} is missing"))),
    }
}

/// Fail unless `body` is the sample text.
pub fn expect_sample_body(body: &[u8]) -> ProbeResult<()> {
    if body == SAMPLE_TEXT.as_bytes() {
        Ok(())
    } else {
        Err(ProbeError::Verification(format!(
            "body differs from the uploaded text ({} bytes, expected {})",
            body.len(),
            SAMPLE_TEXT.len()
        )))
    }
}

/// The smoke suite for one bucket and folder.
#[derive(Debug, Clone)]
pub struct SmokeSuite {
    store: ObjectStore,
    keys: SmokeKeys,
    create_bucket: bool,
    now: DateTime<Utc>,
}

impl SmokeSuite {
    /// Suite writing below `folder` in `store`'s bucket.
    pub fn new(store: ObjectStore, folder: &str) -> Self {
        let now = Utc::now();
        Self {
            store,
            keys: SmokeKeys::new(folder, now),
            create_bucket: false,
            now,
        }
    }

    /// Create the bucket when it does not exist.
    #[must_use]
    pub fn create_bucket(mut self, create: bool) -> Self {
        self.create_bucket = create;
        self
    }

    /// Paths the suite writes.
    #[must_use]
    pub fn keys(&self) -> &SmokeKeys {
        &self.keys
    }

    /// Run every step and report their outcomes.
    ///
    /// Only a missing bucket ends the run early; every other failure is
    /// recorded and the next step runs.
    pub async fn run(&self) -> SuiteReport {
        let mut report = SuiteReport::new("smoke");
        let store = &self.store;
        let keys = &self.keys;

        report.step("list buckets", self.list_buckets()).await;
        if report
            .step("ensure bucket", store.ensure_bucket(self.create_bucket))
            .await
            .is_none()
        {
            return report;
        }

        let versioned = report
            .step("versioning", self.ensure_versioning())
            .await
            .unwrap_or(false);
        report.step("tagging", self.show_tags()).await;
        report.step("acl", self.show_acl()).await;
        report.step("location", self.show_location()).await;

        report
            .step("list sample objects", self.list_sample(&keys.folder))
            .await;
        let counts = [
            ("count test objects (v2)", ListingScheme::Continuation, keys.prefix.as_str()),
            ("count test objects (v1)", ListingScheme::Marker, keys.prefix.as_str()),
            ("count all objects (v2)", ListingScheme::Continuation, ""),
            ("count all objects (v1)", ListingScheme::Marker, ""),
        ];
        for (name, scheme, prefix) in counts {
            report
                .step(name, count_objects(store, scheme, prefix, PAGE_SIZE, Some(COUNT_CAP)))
                .await;
        }

        report.step("create folder object", self.create_folder()).await;
        let created = report
            .step("create text object", self.create_text_object())
            .await;
        report
            .step("fetch content and metadata", self.fetch_and_verify())
            .await;
        report
            .step("fetch through presigned url", self.fetch_presigned())
            .await;
        report
            .step("list test objects", self.list_sample(&keys.prefix))
            .await;

        report.step("copy object", self.copy_and_verify()).await;
        let updated = report.step("create new version", self.create_new_version()).await;
        if versioned {
            if let (Some(first), Some(second)) = (created.flatten(), updated.flatten()) {
                report
                    .step("distinct version ids", async move {
                        if first == second {
                            Err(ProbeError::Verification(format!(
                                "new version reused id {first}"
                            )))
                        } else {
                            Ok(())
                        }
                    })
                    .await;
            }
        }
        report.step("list versions", self.list_versions(false)).await;
        report
            .step("list versions with metadata", self.list_versions(true))
            .await;

        let paged = [
            ("paged listing with markers", ListingScheme::Marker),
            ("paged listing with continuation tokens", ListingScheme::Continuation),
        ];
        for (name, scheme) in paged {
            report
                .step(name, count_objects(store, scheme, &keys.prefix, PAGE_SIZE, Some(COUNT_CAP)))
                .await;
        }

        report.step("delete test objects", self.delete_test_objects()).await;
        report
    }

    async fn list_buckets(&self) -> ProbeResult<()> {
        let names = self.store.list_bucket_names().await?;
        info!(count = names.len(), buckets = ?names, "visible buckets");
        Ok(())
    }

    async fn ensure_versioning(&self) -> ProbeResult<bool> {
        let state = self.store.versioning().await?;
        info!(bucket = self.store.bucket(), ?state, "bucket versioning");
        if state != VersioningState::Enabled {
            self.store.set_versioning(true).await?;
            info!(bucket = self.store.bucket(), "enabled bucket versioning");
        }
        Ok(true)
    }

    async fn show_tags(&self) -> ProbeResult<()> {
        let tags = self.store.tags().await?;
        info!(bucket = self.store.bucket(), ?tags, "bucket tagging");
        Ok(())
    }

    async fn show_acl(&self) -> ProbeResult<()> {
        let acl = self.store.acl().await?;
        info!(bucket = self.store.bucket(), owner = ?acl.owner, "bucket owner");
        for grant in &acl.grants {
            info!(grantee = %grant.grantee, permission = %grant.permission, "bucket grant");
        }
        Ok(())
    }

    async fn show_location(&self) -> ProbeResult<()> {
        let location = self.store.location().await?;
        info!(
            bucket = self.store.bucket(),
            location = location.as_deref().unwrap_or("us-east-1"),
            "bucket location"
        );
        Ok(())
    }

    async fn list_sample(&self, prefix: &str) -> ProbeResult<()> {
        let request = self.store.listing(prefix, SAMPLE_SIZE)?;
        let result = Traverser::new(self.store.marker_source(), request)
            .with_item_cap(Some(u64::from(SAMPLE_SIZE)))
            .run(|item| {
                info!(key = %item.key, size = item.size, last_modified = %item.last_modified, "listed");
                ControlFlow::Continue(())
            })
            .await?;
        info!(prefix, listed = result.visited, "sample listing");
        Ok(())
    }

    async fn create_folder(&self) -> ProbeResult<()> {
        let metadata = HashMap::from([
            ("document-type".to_owned(), "folder".to_owned()),
            ("document-date".to_owned(), self.now.format("%Y-%m-%d").to_string()),
        ]);
        self.store.put_folder(&self.keys.folder, metadata).await?;
        info!(path = %self.keys.folder, "created folder object");
        Ok(())
    }

    fn text_options(&self, status: &str) -> PutOptions {
        PutOptions::builder()
            .content_type("text/plain")
            .content_encoding("UTF-8")
            .content_md5(true)
            .metadata(document_metadata(status, self.now))
            .build()
    }

    async fn create_text_object(&self) -> ProbeResult<Option<String>> {
        let outcome = self
            .store
            .put_object(
                &self.keys.first,
                Bytes::from_static(SAMPLE_TEXT.as_bytes()),
                &self.text_options("first"),
            )
            .await?;
        info!(
            path = %self.keys.first,
            e_tag = ?outcome.e_tag,
            version = ?outcome.version_id,
            "created text object"
        );
        Ok(outcome.version_id)
    }

    async fn fetch_and_verify(&self) -> ProbeResult<()> {
        let object = self.store.get_object(&self.keys.first, None).await?;
        info!(
            path = %self.keys.first,
            content_type = ?object.content_type,
            version = ?object.version_id,
            metadata = ?object.metadata,
            "fetched object"
        );
        expect_sample_body(&object.body)?;
        expect_metadata(&object.metadata, STATUS_KEY, "first")
    }

    async fn fetch_presigned(&self) -> ProbeResult<()> {
        let url = self.store.presign_get(&self.keys.first, PRESIGN_EXPIRY).await?;
        info!(path = %self.keys.first, "presigned url created");

        let failure = |e: reqwest::Error| {
            let failure = BackendRequestFailure::new("PresignedGet", e.to_string());
            match e.status() {
                Some(status) => failure.with_status(status.as_u16()),
                None => failure,
            }
        };
        let response = reqwest::get(&url)
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(failure)?;
        let body = response.bytes().await.map_err(failure)?;
        expect_sample_body(&body)
    }

    async fn copy_and_verify(&self) -> ProbeResult<()> {
        let outcome = self
            .store
            .copy_object(
                &self.keys.first,
                &self.keys.second,
                document_metadata("copied", self.now),
            )
            .await?;
        info!(path = %self.keys.second, e_tag = ?outcome.e_tag, "created copy");

        let head = self.store.head_object(&self.keys.second, None).await?;
        if head.size != SAMPLE_TEXT.len() as u64 {
            return Err(ProbeError::Verification(format!(
                "copy has {} bytes, expected {}",
                head.size,
                SAMPLE_TEXT.len()
            )));
        }
        expect_metadata(&head.metadata, STATUS_KEY, "copied")
    }

    async fn create_new_version(&self) -> ProbeResult<Option<String>> {
        let outcome = self
            .store
            .put_object(
                &self.keys.first,
                Bytes::from_static(SAMPLE_TEXT.as_bytes()),
                &self.text_options("second"),
            )
            .await?;
        info!(path = %self.keys.first, version = ?outcome.version_id, "created new version");

        let head = self.store.head_object(&self.keys.first, None).await?;
        expect_metadata(&head.metadata, STATUS_KEY, "second")?;
        Ok(outcome.version_id)
    }

    async fn list_versions(&self, with_metadata: bool) -> ProbeResult<()> {
        let request = self.store.listing(&self.keys.first, VERSION_PAGE_SIZE)?;
        let mut versions: Vec<ObjectDescriptor> = Vec::new();
        Traverser::new(self.store.version_source(), request)
            .run(|item| {
                versions.push(item);
                ControlFlow::Continue(())
            })
            .await?;

        if versions.is_empty() {
            return Err(ProbeError::Verification(format!(
                "no versions listed for {}",
                self.keys.first
            )));
        }

        for version in &versions {
            let status = if with_metadata {
                let head = self
                    .store
                    .head_object(self.store.path_of(&version.key), version.version_id.as_deref())
                    .await?;
                head.metadata.get(STATUS_KEY).cloned()
            } else {
                None
            };
            info!(
                key = %version.key,
                version = ?version.version_id,
                latest = ?version.is_latest,
                last_modified = %version.last_modified,
                status = ?status,
                "object version"
            );
        }
        Ok(())
    }

    /// Remove every version and delete marker below the test prefix.
    async fn delete_test_objects(&self) -> ProbeResult<()> {
        let request = self.store.listing(&self.keys.prefix, DELETE_PAGE_SIZE)?;
        let mut targets = Vec::new();
        Traverser::new(self.store.version_source().with_delete_markers(true), request)
            .run(|item| {
                targets.push((item.key, item.version_id));
                ControlFlow::Continue(())
            })
            .await?;
        let deleted = self.store.delete_versions(&targets).await?;
        info!(prefix = %self.keys.prefix, listed = targets.len(), deleted, "deleted test objects");
        Ok(())
    }
}
