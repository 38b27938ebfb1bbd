//! Bucket-scoped storage facade over the S3 client.

use std::collections::HashMap;
use std::time::Duration;

use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, BucketVersioningStatus, CreateBucketConfiguration,
    Delete, MetadataDirective, ObjectIdentifier, VersioningConfiguration,
};
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use s3probe_core::{BackendRequestFailure, ProbeError, ProbeResult, ServiceProperties};
use s3probe_paginate::ListingRequest;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use crate::connect::build_client;
use crate::error::{body_failure, build_failure, sdk_failure};
use crate::sources::{ContinuationSource, MarkerSource, VersionSource};
use crate::time::to_utc;

/// Maximum number of keys per `DeleteObjects` request.
pub const DELETE_BATCH_SIZE: usize = 1000;

/// Characters escaped in the `x-amz-copy-source` header. Path separators stay.
const COPY_SOURCE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Body of one `DeleteObjects` request.
fn delete_request(batch: &[(String, Option<String>)]) -> Result<Delete, Failure> {
    let objects = batch
        .iter()
        .map(|(key, version_id)| {
            ObjectIdentifier::builder()
                .key(key)
                .set_version_id(version_id.clone())
                .build()
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| build_failure("DeleteObjects", &e))?;
    Delete::builder()
        .set_objects(Some(objects))
        .build()
        .map_err(|e| build_failure("DeleteObjects", &e))
}

/// `bucket/key` value for a copy request, with the key URL-encoded.
fn copy_source(bucket: &str, key: &str) -> String {
    format!("{bucket}/{}", utf8_percent_encode(key, COPY_SOURCE_ENCODE_SET))
}

/// Content type used for folder placeholder objects.
pub const FOLDER_CONTENT_TYPE: &str = "application/directory";

type Failure = BackendRequestFailure;

/// Versioning state of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersioningState {
    /// Versioning was never enabled.
    Unversioned,
    /// New writes create versions.
    Enabled,
    /// Versioning was enabled once and is now suspended.
    Suspended,
}

/// One ACL grant, rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclGrant {
    /// Grantee ID, URI, e-mail or display name, whichever is present.
    pub grantee: String,
    /// Permission name (`FULL_CONTROL`, `READ`, ...).
    pub permission: String,
}

/// Owner and grants of a bucket ACL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclSummary {
    /// Owner display name or ID.
    pub owner: Option<String>,
    /// Grants in backend order.
    pub grants: Vec<AclGrant>,
}

/// Options for [`ObjectStore::put_object`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct PutOptions {
    /// MIME type of the body.
    #[builder(default = String::from("application/octet-stream"), setter(into))]
    pub content_type: String,
    /// Content encoding header, e.g. `"UTF-8"` for JSON documents.
    #[builder(default, setter(strip_option, into))]
    pub content_encoding: Option<String>,
    /// Send a `Content-MD5` header computed from the body.
    #[builder(default = false)]
    pub content_md5: bool,
    /// User metadata (`x-amz-meta-*`).
    #[builder(default)]
    pub metadata: HashMap<String, String>,
}

/// Result of a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOutcome {
    /// Entity tag of the stored object.
    pub e_tag: Option<String>,
    /// Version ID, when versioning is enabled.
    pub version_id: Option<String>,
}

/// Object attributes without the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHead {
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub content_type: Option<String>,
    /// User metadata.
    pub metadata: HashMap<String, String>,
    /// Version ID.
    pub version_id: Option<String>,
    /// Entity tag.
    pub e_tag: Option<String>,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
}

/// An object body together with its attributes.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Object content.
    pub body: Bytes,
    /// MIME type.
    pub content_type: Option<String>,
    /// User metadata.
    pub metadata: HashMap<String, String>,
    /// Version ID.
    pub version_id: Option<String>,
}

/// Operations on one bucket of an S3-compatible backend.
///
/// Paths passed to the facade are logical; [`ObjectStore::key`] maps them to
/// backend keys, prepending the bucket name for gateways that need it.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    client: Client,
    bucket: String,
    prefix_with_bucket_name: bool,
}

impl ObjectStore {
    /// Wrap an existing client.
    pub fn new(client: Client, bucket: impl Into<String>, prefix_with_bucket_name: bool) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix_with_bucket_name,
        }
    }

    /// Build a client from `props` and scope it to `bucket`.
    pub fn connect(props: &ServiceProperties, bucket: impl Into<String>) -> Self {
        Self::new(build_client(props), bucket, props.prefix_with_bucket_name)
    }

    /// Same backend, different bucket.
    #[must_use]
    pub fn with_bucket(&self, bucket: impl Into<String>) -> Self {
        Self::new(self.client.clone(), bucket, self.prefix_with_bucket_name)
    }

    /// Underlying SDK client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Bucket this facade operates on.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Backend key for a logical path.
    #[must_use]
    pub fn key(&self, path: &str) -> String {
        if self.prefix_with_bucket_name {
            format!("{}/{path}", self.bucket)
        } else {
            path.to_owned()
        }
    }

    /// Logical path of a backend key, the inverse of [`ObjectStore::key`].
    #[must_use]
    pub fn path_of<'a>(&self, key: &'a str) -> &'a str {
        if self.prefix_with_bucket_name {
            key.strip_prefix(self.bucket.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(key)
        } else {
            key
        }
    }

    // -- Buckets --------------------------------------------------------

    /// Names of all buckets visible to the credentials.
    pub async fn list_bucket_names(&self) -> Result<Vec<String>, Failure> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| sdk_failure("ListBuckets", &e))?;
        Ok(output
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(ToOwned::to_owned))
            .collect())
    }

    /// Whether the bucket exists and is reachable.
    pub async fn bucket_exists(&self) -> Result<bool, Failure> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let failure = sdk_failure("HeadBucket", &e);
                if failure.is_not_found() {
                    Ok(false)
                } else {
                    Err(failure)
                }
            }
        }
    }

    /// Create the bucket in the client's region.
    pub async fn create_bucket(&self) -> Result<(), Failure> {
        let mut call = self.client.create_bucket().bucket(&self.bucket);
        if let Some(region) = self.client.config().region().map(AsRef::<str>::as_ref) {
            if region != "us-east-1" {
                call = call.create_bucket_configuration(
                    CreateBucketConfiguration::builder()
                        .location_constraint(BucketLocationConstraint::from(region))
                        .build(),
                );
            }
        }
        call.send()
            .await
            .map_err(|e| sdk_failure("CreateBucket", &e))?;
        info!(bucket = %self.bucket, "created bucket");
        Ok(())
    }

    /// Make sure the bucket exists, creating it when `create` allows.
    ///
    /// Returns `true` when the bucket was created by this call.
    pub async fn ensure_bucket(&self, create: bool) -> ProbeResult<bool> {
        if self.bucket_exists().await? {
            debug!(bucket = %self.bucket, "bucket exists");
            return Ok(false);
        }
        if !create {
            return Err(ProbeError::Config(format!(
                "bucket {} does not exist and create_bucket is disabled",
                self.bucket
            )));
        }
        self.create_bucket().await?;
        Ok(true)
    }

    /// Current versioning state.
    pub async fn versioning(&self) -> Result<VersioningState, Failure> {
        let output = self
            .client
            .get_bucket_versioning()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| sdk_failure("GetBucketVersioning", &e))?;
        Ok(match output.status() {
            Some(BucketVersioningStatus::Enabled) => VersioningState::Enabled,
            Some(BucketVersioningStatus::Suspended) => VersioningState::Suspended,
            _ => VersioningState::Unversioned,
        })
    }

    /// Enable or suspend versioning.
    pub async fn set_versioning(&self, enabled: bool) -> Result<(), Failure> {
        let status = if enabled {
            BucketVersioningStatus::Enabled
        } else {
            BucketVersioningStatus::Suspended
        };
        self.client
            .put_bucket_versioning()
            .bucket(&self.bucket)
            .versioning_configuration(VersioningConfiguration::builder().status(status).build())
            .send()
            .await
            .map_err(|e| sdk_failure("PutBucketVersioning", &e))?;
        Ok(())
    }

    /// Bucket tags. A bucket without a tag set yields an empty list.
    pub async fn tags(&self) -> Result<Vec<(String, String)>, Failure> {
        match self.client.get_bucket_tagging().bucket(&self.bucket).send().await {
            Ok(output) => Ok(output
                .tag_set()
                .iter()
                .map(|t| (t.key().to_owned(), t.value().to_owned()))
                .collect()),
            Err(e) => {
                let failure = sdk_failure("GetBucketTagging", &e);
                if failure.is_not_found() {
                    Ok(Vec::new())
                } else {
                    Err(failure)
                }
            }
        }
    }

    /// Bucket ACL owner and grants.
    pub async fn acl(&self) -> Result<AclSummary, Failure> {
        let output = self
            .client
            .get_bucket_acl()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| sdk_failure("GetBucketAcl", &e))?;

        let owner = output
            .owner()
            .and_then(|o| o.display_name().or(o.id()))
            .map(ToOwned::to_owned);
        let grants = output
            .grants()
            .iter()
            .map(|g| {
                let grantee = g
                    .grantee()
                    .and_then(|t| t.id().or(t.uri()).or(t.email_address()).or(t.display_name()))
                    .unwrap_or("<unknown>")
                    .to_owned();
                let permission = g
                    .permission()
                    .map_or_else(|| "<none>".to_owned(), |p| p.as_str().to_owned());
                AclGrant { grantee, permission }
            })
            .collect();
        Ok(AclSummary { owner, grants })
    }

    /// Bucket location constraint; `None` means `us-east-1`.
    pub async fn location(&self) -> Result<Option<String>, Failure> {
        let output = self
            .client
            .get_bucket_location()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| sdk_failure("GetBucketLocation", &e))?;
        Ok(output
            .location_constraint()
            .map(|c| c.as_str().to_owned())
            .filter(|c| !c.is_empty()))
    }

    // -- Objects --------------------------------------------------------

    /// Create an empty folder placeholder at `path`.
    pub async fn put_folder(
        &self,
        path: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PutOutcome, Failure> {
        let options = PutOptions::builder()
            .content_type(FOLDER_CONTENT_TYPE)
            .metadata(metadata)
            .build();
        self.put_object(path, Bytes::new(), &options).await
    }

    /// Upload `body` to `path`.
    pub async fn put_object(
        &self,
        path: &str,
        body: impl Into<Bytes>,
        options: &PutOptions,
    ) -> Result<PutOutcome, Failure> {
        let body = body.into();
        let key = self.key(path);
        let content_md5 = options
            .content_md5
            .then(|| BASE64_STANDARD.encode(Md5::digest(&body)));

        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(&options.content_type)
            .set_content_encoding(options.content_encoding.clone())
            .set_content_md5(content_md5)
            .content_length(i64::try_from(body.len()).unwrap_or(i64::MAX))
            .set_metadata(Some(options.metadata.clone()).filter(|m| !m.is_empty()))
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| sdk_failure("PutObject", &e))?;

        debug!(bucket = %self.bucket, key = %key, version = ?output.version_id(), "stored object");
        Ok(PutOutcome {
            e_tag: output.e_tag().map(ToOwned::to_owned),
            version_id: output.version_id().map(ToOwned::to_owned),
        })
    }

    /// Download `path`, optionally a specific version.
    pub async fn get_object(
        &self,
        path: &str,
        version_id: Option<&str>,
    ) -> Result<StoredObject, Failure> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.key(path))
            .set_version_id(version_id.map(ToOwned::to_owned))
            .send()
            .await
            .map_err(|e| sdk_failure("GetObject", &e))?;

        let content_type = output.content_type().map(ToOwned::to_owned);
        let metadata = output.metadata().cloned().unwrap_or_default();
        let version_id = output.version_id().map(ToOwned::to_owned);
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| body_failure("GetObject", &e))?
            .into_bytes();

        Ok(StoredObject {
            body,
            content_type,
            metadata,
            version_id,
        })
    }

    /// Attributes of `path`, optionally a specific version.
    pub async fn head_object(
        &self,
        path: &str,
        version_id: Option<&str>,
    ) -> Result<ObjectHead, Failure> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.key(path))
            .set_version_id(version_id.map(ToOwned::to_owned))
            .send()
            .await
            .map_err(|e| sdk_failure("HeadObject", &e))?;

        Ok(ObjectHead {
            size: output
                .content_length()
                .and_then(|l| u64::try_from(l).ok())
                .unwrap_or(0),
            content_type: output.content_type().map(ToOwned::to_owned),
            metadata: output.metadata().cloned().unwrap_or_default(),
            version_id: output.version_id().map(ToOwned::to_owned),
            e_tag: output.e_tag().map(ToOwned::to_owned),
            last_modified: to_utc(output.last_modified()),
        })
    }

    /// Server-side copy of `from` to `to`, replacing the user metadata.
    pub async fn copy_object(
        &self,
        from: &str,
        to: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PutOutcome, Failure> {
        let output = self
            .client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(copy_source(&self.bucket, &self.key(from)))
            .key(self.key(to))
            .metadata_directive(MetadataDirective::Replace)
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|e| sdk_failure("CopyObject", &e))?;

        Ok(PutOutcome {
            e_tag: output
                .copy_object_result()
                .and_then(|r| r.e_tag())
                .map(ToOwned::to_owned),
            version_id: output.version_id().map(ToOwned::to_owned),
        })
    }

    /// Delete `path` (the current version, or a delete marker when versioned).
    pub async fn delete_object(&self, path: &str) -> Result<(), Failure> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.key(path))
            .send()
            .await
            .map_err(|e| sdk_failure("DeleteObject", &e))?;
        Ok(())
    }

    /// Delete backend keys in batches of [`DELETE_BATCH_SIZE`].
    ///
    /// Keys are used verbatim (as returned by a listing). Returns the number of
    /// keys the backend reported as deleted.
    pub async fn delete_keys(&self, keys: &[String]) -> Result<usize, Failure> {
        let targets: Vec<(String, Option<String>)> =
            keys.iter().map(|k| (k.clone(), None)).collect();
        self.delete_versions(&targets).await
    }

    /// Delete `(key, version_id)` pairs in batches of [`DELETE_BATCH_SIZE`].
    ///
    /// Keys are backend keys as returned by a listing. A `None` version
    /// deletes the current version. Returns the number of entries the backend
    /// reported as deleted.
    pub async fn delete_versions(
        &self,
        targets: &[(String, Option<String>)],
    ) -> Result<usize, Failure> {
        let mut deleted = 0;
        for batch in targets.chunks(DELETE_BATCH_SIZE) {
            let output = self
                .client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete_request(batch)?)
                .send()
                .await
                .map_err(|e| sdk_failure("DeleteObjects", &e))?;

            if let Some(first) = output.errors().first() {
                return Err(BackendRequestFailure::new(
                    "DeleteObjects",
                    first.message().unwrap_or("delete rejected").to_owned(),
                )
                .with_code(first.code().unwrap_or("Unknown")));
            }
            deleted += output.deleted().len();
        }
        Ok(deleted)
    }

    /// Presigned GET URL for `path`, valid for `expires_in`.
    pub async fn presign_get(&self, path: &str, expires_in: Duration) -> Result<String, Failure> {
        let config =
            PresigningConfig::expires_in(expires_in).map_err(|e| build_failure("GetObject", &e))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.key(path))
            .presigned(config)
            .await
            .map_err(|e| sdk_failure("GetObject", &e))?;
        Ok(request.uri().to_owned())
    }

    // -- Listings -------------------------------------------------------

    /// Listing request for the logical folder `prefix`.
    pub fn listing(&self, prefix: &str, page_size: u32) -> ProbeResult<ListingRequest> {
        let prefix = if prefix.is_empty() {
            if self.prefix_with_bucket_name {
                format!("{}/", self.bucket)
            } else {
                String::new()
            }
        } else {
            self.key(prefix)
        };
        ListingRequest::new(self.bucket.clone(), prefix, page_size)
    }

    /// `ListObjects` (v1) adapter.
    #[must_use]
    pub fn marker_source(&self) -> MarkerSource {
        MarkerSource::new(self.client.clone())
    }

    /// `ListObjectsV2` adapter.
    #[must_use]
    pub fn continuation_source(&self) -> ContinuationSource {
        ContinuationSource::new(self.client.clone())
    }

    /// `ListObjectVersions` adapter.
    #[must_use]
    pub fn version_source(&self) -> VersionSource {
        VersionSource::new(self.client.clone())
    }
}
