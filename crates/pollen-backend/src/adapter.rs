//! Uniform storage capability set
//!
//! Every provider adapter implements [`StorageBackend`]. The orchestrator only
//! ever sees `Arc<dyn StorageBackend>`; provider-specific behaviour stays
//! behind this trait or behind [`NativeClient`].

use crate::native::NativeClient;
use async_trait::async_trait;
use bytes::Bytes;
use pollen_common::{BackendKind, Error, Result};
use tracing::debug;

/// Object storage operations shared by all providers
///
/// Adapters hold no per-object state; every call goes straight to the
/// provider.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Provider identity
    fn kind(&self) -> BackendKind;

    /// Create a bucket (container)
    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    /// Delete a bucket that holds no objects
    async fn remove_empty_bucket(&self, bucket: &str) -> Result<()>;

    /// Enumerate and delete every object, then delete the bucket
    ///
    /// Not transactional: a failure part way leaves the bucket partially
    /// emptied.
    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let keys = self.list_objects(bucket).await?;
        debug!(
            "{}: emptying bucket {} ({} objects)",
            self.kind(),
            bucket,
            keys.len()
        );
        for key in &keys {
            self.delete_object(bucket, key).await.map_err(|e| {
                Error::backend(
                    self.kind(),
                    e.status(),
                    format!("failed to delete {bucket}/{key} while deleting bucket: {e}"),
                )
            })?;
        }
        self.remove_empty_bucket(bucket).await
    }

    /// Bucket names visible to the configured credentials
    async fn list_buckets(&self) -> Result<Vec<String>>;

    /// Store one body under `bucket/key`, replacing any previous body
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()>;

    /// Fetch the full body stored under `bucket/key`
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Every key in the bucket, following pagination
    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>>;

    /// Server-side copy inside this provider
    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()>;

    /// The adapter's own client, for provider-specific calls
    fn native(&self) -> NativeClient<'_>;

    /// Release connections held by the adapter
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
