//! Pollen client
//!
//! The single entry point callers use. It routes every command through
//! [`Command::resolve`], so a caller never needs to know whether an operation
//! is shared across backends or passed through to one of them.

use crate::command::Command;
use crate::commands::{
    CopyObjectCommand, CopyObjectOutput, CreateBucketCommand, DeleteBucketCommand,
    DeleteObjectCommand, GetObjectCommand, ListBucketsCommand, ListObjectsCommand,
    NativeBucketCommand, NativeRequest, PutObjectCommand,
};
use crate::orchestrator::{ClientOptions, ListReport, Orchestrator};
use bytes::Bytes;
use pollen_backend::{BackendRegistry, NativeResponse};
use pollen_common::{BackendKind, PollenConfig, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Client session over one immutable backend set
#[derive(Debug)]
pub struct PollenClient {
    orchestrator: Orchestrator,
}

impl PollenClient {
    /// Build the registry from configuration
    ///
    /// Fails with a configuration error before any network call when
    /// credentials or the native backend are missing.
    pub async fn new(config: &PollenConfig) -> Result<Self> {
        let registry = BackendRegistry::from_config(config).await?;
        Self::from_registry(Arc::new(registry), ClientOptions::from_config(config))
    }

    pub fn from_registry(registry: Arc<BackendRegistry>, options: ClientOptions) -> Result<Self> {
        Ok(Self {
            orchestrator: Orchestrator::new(registry, options)?,
        })
    }

    #[must_use]
    pub const fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Active backends, in share placement order
    #[must_use]
    pub fn backends(&self) -> Vec<BackendKind> {
        self.orchestrator.registry().kinds()
    }

    /// Resolve any command
    pub async fn send<C: Command>(&self, command: &C) -> Result<C::Output> {
        debug!("Dispatching {} ({})", command.name(), command.dispatch());
        let result = command.resolve(&self.orchestrator).await;
        if let Err(e) = &result {
            warn!("{} failed: {}", command.name(), e);
        }
        result
    }

    pub async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.send(&CreateBucketCommand::new(bucket)).await
    }

    pub async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.send(&DeleteBucketCommand::new(bucket)).await
    }

    pub async fn list_buckets(&self) -> Result<ListReport> {
        self.send(&ListBucketsCommand).await
    }

    pub async fn put_object(&self, bucket: &str, key: &str, body: impl Into<Bytes>) -> Result<()> {
        self.send(&PutObjectCommand::new(bucket, key, body)).await
    }

    /// Put a local file; the key defaults to the file name
    pub async fn put_file(&self, bucket: &str, path: &Path, key: Option<&str>) -> Result<()> {
        self.orchestrator.put_file(bucket, path, key).await
    }

    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        Ok(self.send(&GetObjectCommand::new(bucket, key)).await?.body)
    }

    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.send(&DeleteObjectCommand::new(bucket, key)).await
    }

    pub async fn list_objects(&self, bucket: &str) -> Result<ListReport> {
        self.send(&ListObjectsCommand::new(bucket)).await
    }

    /// Single-backend copy; `copy_source` is `sourceBucket/sourceKey`
    pub async fn copy_object(
        &self,
        bucket: &str,
        key: &str,
        copy_source: &str,
    ) -> Result<CopyObjectOutput> {
        self.send(&CopyObjectCommand::new(bucket, key, copy_source))
            .await
    }

    pub async fn native(&self, request: NativeRequest) -> Result<NativeResponse> {
        self.send(&NativeBucketCommand::new(request)).await
    }

    /// Release every adapter's connections
    pub async fn shutdown(&self) -> Result<()> {
        self.orchestrator.registry().shutdown().await
    }
}
