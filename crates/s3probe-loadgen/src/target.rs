//! Where the load generator writes.

use async_trait::async_trait;
use bytes::Bytes;
use s3probe_client::{ObjectStore, PutOptions};
use s3probe_core::keys::folder_prefix;
use s3probe_core::ProbeResult;
use s3probe_paginate::Traverser;

/// Operations the load generator needs from a storage backend.
#[async_trait]
pub trait LoadTarget: Send + Sync + 'static {
    /// Whether anything exists under the folder `root`.
    async fn has_root(&self, root: &str) -> ProbeResult<bool>;

    /// Create an empty folder object at `path`.
    async fn create_container(&self, path: &str) -> ProbeResult<()>;

    /// Store `body` at `path`.
    async fn upload(&self, path: &str, body: Bytes, options: &PutOptions) -> ProbeResult<()>;
}

#[async_trait]
impl LoadTarget for ObjectStore {
    async fn has_root(&self, root: &str) -> ProbeResult<bool> {
        let request = self.listing(&folder_prefix(root), 1)?;
        let result = Traverser::new(self.marker_source(), request)
            .with_item_cap(Some(1))
            .count()
            .await?;
        Ok(result.visited > 0)
    }

    async fn create_container(&self, path: &str) -> ProbeResult<()> {
        self.put_folder(&folder_prefix(path), Default::default()).await?;
        Ok(())
    }

    async fn upload(&self, path: &str, body: Bytes, options: &PutOptions) -> ProbeResult<()> {
        self.put_object(path, body, options).await?;
        Ok(())
    }
}
