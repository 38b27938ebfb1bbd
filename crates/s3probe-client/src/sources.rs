//! Listing adapters, one [`PageSource`] per S3 pagination scheme.
//!
//! | Adapter | Operation | Token |
//! |---------|-----------|-------|
//! | [`MarkerSource`] | `ListObjects` | `NextMarker`, else the last key |
//! | [`ContinuationSource`] | `ListObjectsV2` | `NextContinuationToken` |
//! | [`VersionSource`] | `ListObjectVersions` | key and version-id markers |

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput;
use aws_sdk_s3::operation::list_objects::ListObjectsOutput;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::types::{DeleteMarkerEntry, Object, ObjectVersion, Owner};
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use s3probe_core::BackendRequestFailure;
use s3probe_paginate::{ListingRequest, ObjectDescriptor, Page, PageSource, PageToken};

use crate::error::sdk_failure;
use crate::time::to_utc;

/// Pages through `ListObjects` (v1) using key markers.
///
/// The request's start token doubles as the initial marker, so a traversal can
/// begin after any key.
#[derive(Debug, Clone)]
pub struct MarkerSource {
    client: Client,
}

impl MarkerSource {
    /// Create an adapter over `client`.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for MarkerSource {
    async fn fetch_page(&mut self, request: &ListingRequest) -> Result<Page, BackendRequestFailure> {
        let output = self
            .client
            .list_objects()
            .bucket(&request.bucket)
            .prefix(&request.prefix)
            .max_keys(max_keys(request.page_size))
            .set_marker(request.start_token.as_ref().map(|t| t.as_str().to_owned()))
            .send()
            .await
            .map_err(|e| sdk_failure("ListObjects", &e))?;
        Ok(marker_page(&output))
    }
}

fn marker_page(output: &ListObjectsOutput) -> Page {
    let items: Vec<ObjectDescriptor> = output.contents().iter().map(from_object).collect();
    if !output.is_truncated().unwrap_or(false) {
        return Page::last(items);
    }

    // NextMarker is only returned when a delimiter is set.
    let next = output
        .next_marker()
        .map(ToOwned::to_owned)
        .or_else(|| items.last().map(|o| o.key.clone()));
    Page {
        items,
        next_token: next.map(PageToken::new),
        is_last: false,
    }
}

/// Pages through `ListObjectsV2` using continuation tokens.
#[derive(Debug, Clone)]
pub struct ContinuationSource {
    client: Client,
    start_after: Option<String>,
    fetch_owner: bool,
}

impl ContinuationSource {
    /// Create an adapter over `client`.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            start_after: None,
            fetch_owner: false,
        }
    }

    /// Begin the listing after `key`. Only sent with the first request.
    #[must_use]
    pub fn start_after(mut self, key: impl Into<String>) -> Self {
        self.start_after = Some(key.into());
        self
    }

    /// Ask the backend to include object owners.
    #[must_use]
    pub fn fetch_owner(mut self, fetch_owner: bool) -> Self {
        self.fetch_owner = fetch_owner;
        self
    }
}

#[async_trait]
impl PageSource for ContinuationSource {
    async fn fetch_page(&mut self, request: &ListingRequest) -> Result<Page, BackendRequestFailure> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&request.bucket)
            .prefix(&request.prefix)
            .max_keys(max_keys(request.page_size))
            .fetch_owner(self.fetch_owner)
            .set_continuation_token(request.start_token.as_ref().map(|t| t.as_str().to_owned()))
            .set_start_after(start_after_for(request, self.start_after.as_deref()))
            .send()
            .await
            .map_err(|e| sdk_failure("ListObjectsV2", &e))?;
        Ok(continuation_page(&output))
    }
}

/// `StartAfter` applies to the first request only; later pages resume from
/// the continuation token.
fn start_after_for(request: &ListingRequest, start_after: Option<&str>) -> Option<String> {
    match request.start_token {
        Some(_) => None,
        None => start_after.map(ToOwned::to_owned),
    }
}

fn continuation_page(output: &ListObjectsV2Output) -> Page {
    let items = output.contents().iter().map(from_object).collect();
    if !output.is_truncated().unwrap_or(false) {
        return Page::last(items);
    }
    Page {
        items,
        next_token: output.next_continuation_token().map(PageToken::new),
        is_last: false,
    }
}

/// Pages through `ListObjectVersions`.
///
/// Delete markers are skipped unless [`VersionSource::with_delete_markers`]
/// asks for them. The page token packs the key marker and the version-id
/// marker into one opaque string.
#[derive(Debug, Clone)]
pub struct VersionSource {
    client: Client,
    delete_markers: bool,
}

impl VersionSource {
    /// Create an adapter over `client`.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            delete_markers: false,
        }
    }

    /// Also yield delete markers, as zero-sized descriptors after the
    /// versions of each page.
    #[must_use]
    pub fn with_delete_markers(mut self, include: bool) -> Self {
        self.delete_markers = include;
        self
    }
}

#[async_trait]
impl PageSource for VersionSource {
    async fn fetch_page(&mut self, request: &ListingRequest) -> Result<Page, BackendRequestFailure> {
        let (key_marker, version_marker) = match &request.start_token {
            Some(token) => {
                let (key, version) = decode_version_token(token)?;
                (Some(key), version)
            }
            None => (None, None),
        };

        let output = self
            .client
            .list_object_versions()
            .bucket(&request.bucket)
            .prefix(&request.prefix)
            .max_keys(max_keys(request.page_size))
            .set_key_marker(key_marker)
            .set_version_id_marker(version_marker)
            .send()
            .await
            .map_err(|e| sdk_failure("ListObjectVersions", &e))?;
        Ok(version_page(&output, self.delete_markers))
    }
}

fn version_page(output: &ListObjectVersionsOutput, delete_markers: bool) -> Page {
    let mut items: Vec<ObjectDescriptor> = output.versions().iter().map(from_version).collect();
    if delete_markers {
        items.extend(output.delete_markers().iter().map(from_delete_marker));
    }
    if !output.is_truncated().unwrap_or(false) {
        return Page::last(items);
    }
    let next_token = output
        .next_key_marker()
        .map(|key| encode_version_token(key, output.next_version_id_marker()));
    Page {
        items,
        next_token,
        is_last: false,
    }
}

fn max_keys(page_size: u32) -> i32 {
    i32::try_from(page_size).unwrap_or(i32::MAX)
}

fn owner_name(owner: Option<&Owner>) -> Option<String> {
    owner
        .and_then(|o| o.display_name().or(o.id()))
        .map(ToOwned::to_owned)
}

fn size(bytes: Option<i64>) -> u64 {
    bytes.and_then(|b| u64::try_from(b).ok()).unwrap_or(0)
}

fn from_object(object: &Object) -> ObjectDescriptor {
    let mut descriptor = ObjectDescriptor::new(
        object.key().unwrap_or_default(),
        size(object.size()),
        to_utc(object.last_modified()),
    );
    descriptor.owner = owner_name(object.owner());
    descriptor.e_tag = object.e_tag().map(ToOwned::to_owned);
    descriptor
}

fn from_version(version: &ObjectVersion) -> ObjectDescriptor {
    let mut descriptor = ObjectDescriptor::new(
        version.key().unwrap_or_default(),
        size(version.size()),
        to_utc(version.last_modified()),
    );
    descriptor.version_id = version.version_id().map(ToOwned::to_owned);
    descriptor.owner = owner_name(version.owner());
    descriptor.e_tag = version.e_tag().map(ToOwned::to_owned);
    descriptor.is_latest = version.is_latest();
    descriptor
}

fn from_delete_marker(marker: &DeleteMarkerEntry) -> ObjectDescriptor {
    let mut descriptor = ObjectDescriptor::new(
        marker.key().unwrap_or_default(),
        0,
        to_utc(marker.last_modified()),
    );
    descriptor.version_id = marker.version_id().map(ToOwned::to_owned);
    descriptor.owner = owner_name(marker.owner());
    descriptor.is_latest = marker.is_latest();
    descriptor
}

/// Pack a key marker and an optional version-id marker into one token.
fn encode_version_token(key: &str, version_id: Option<&str>) -> PageToken {
    PageToken::new(format!(
        "{}.{}",
        BASE64_STANDARD.encode(key),
        BASE64_STANDARD.encode(version_id.unwrap_or_default())
    ))
}

fn decode_version_token(
    token: &PageToken,
) -> Result<(String, Option<String>), BackendRequestFailure> {
    let malformed = || {
        BackendRequestFailure::new(
            "ListObjectVersions",
            format!("malformed version page token: {token}"),
        )
    };
    let decode = |part: &str| {
        BASE64_STANDARD
            .decode(part)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(malformed)
    };

    let (key, version) = token.as_str().split_once('.').ok_or_else(malformed)?;
    let key = decode(key)?;
    let version = decode(version)?;
    Ok((key, Some(version).filter(|v| !v.is_empty())))
}
