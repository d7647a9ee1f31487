//! Passthrough commands
//!
//! These bypass sharing entirely: they run on the distinguished backend only,
//! through its native client.

use crate::command::{Command, Dispatch};
use crate::orchestrator::Orchestrator;
use async_trait::async_trait;
use bytes::Bytes;
use pollen_backend::{NativeMethod, NativeResponse, Subresource};
use pollen_common::{CopySource, ObjectLocation, Result};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopyObjectInput {
    pub bucket: String,
    pub key: String,
    /// `sourceBucket/sourceKey`
    pub copy_source: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopyObjectOutput {
    pub source: CopySource,
    pub destination: ObjectLocation,
}

/// Server-side copy on the distinguished backend
#[derive(Clone, Debug)]
pub struct CopyObjectCommand {
    pub input: CopyObjectInput,
}

impl CopyObjectCommand {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        copy_source: impl Into<String>,
    ) -> Self {
        Self {
            input: CopyObjectInput {
                bucket: bucket.into(),
                key: key.into(),
                copy_source: copy_source.into(),
            },
        }
    }
}

#[async_trait]
impl Command for CopyObjectCommand {
    type Output = CopyObjectOutput;

    fn name(&self) -> &'static str {
        "CopyObject"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::Passthrough
    }

    async fn resolve(&self, orchestrator: &Orchestrator) -> Result<CopyObjectOutput> {
        let source = CopySource::parse(&self.input.copy_source)?;
        let adapter = orchestrator.registry().native()?;
        orchestrator
            .call(
                adapter.kind(),
                adapter.copy_object(
                    source.bucket(),
                    source.key(),
                    &self.input.bucket,
                    &self.input.key,
                ),
            )
            .await?;

        let destination = ObjectLocation::new(&self.input.bucket, &self.input.key);
        info!("Copied {} to {} on {}", source, destination, adapter.kind());
        Ok(CopyObjectOutput {
            source,
            destination,
        })
    }
}

/// Provider-specific administrative request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeRequest {
    pub method: NativeMethod,
    pub bucket: String,
    pub key: Option<String>,
    pub subresource: Option<Subresource>,
    pub body: Option<Bytes>,
}

impl NativeRequest {
    pub fn new(method: NativeMethod, bucket: impl Into<String>) -> Self {
        Self {
            method,
            bucket: bucket.into(),
            key: None,
            subresource: None,
            body: None,
        }
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn subresource(mut self, subresource: Subresource) -> Self {
        self.subresource = Some(subresource);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Native request against the distinguished backend
#[derive(Clone, Debug)]
pub struct NativeBucketCommand {
    pub request: NativeRequest,
}

impl NativeBucketCommand {
    pub const fn new(request: NativeRequest) -> Self {
        Self { request }
    }
}

#[async_trait]
impl Command for NativeBucketCommand {
    type Output = NativeResponse;

    fn name(&self) -> &'static str {
        "NativeBucket"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::Passthrough
    }

    async fn resolve(&self, orchestrator: &Orchestrator) -> Result<NativeResponse> {
        let request = &self.request;
        let adapter = orchestrator.registry().native()?;
        orchestrator
            .call(
                adapter.kind(),
                adapter.native().subresource_request(
                    request.method,
                    &request.bucket,
                    request.key.as_deref(),
                    request.subresource,
                    request.body.clone(),
                ),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::ClientOptions;
    use crate::test_util::{Cluster, fast_options};
    use pollen_common::{BackendKind, Error};
    use std::time::Duration;

    #[tokio::test]
    async fn test_copy_runs_on_native_backend_only() {
        let cluster = Cluster::new();
        let orchestrator = cluster.orchestrator(fast_options());
        orchestrator.create_bucket("src").await.unwrap();
        orchestrator.create_bucket("dst").await.unwrap();
        orchestrator.put_object("src", "a", b"data").await.unwrap();

        let copy = CopyObjectCommand::new("dst", "b", "src/a");
        assert_eq!(copy.dispatch(), Dispatch::Passthrough);
        let output = copy.resolve(&orchestrator).await.unwrap();
        assert_eq!(output.source.to_string(), "src/a");
        assert_eq!(output.destination.to_string(), "dst/b");

        assert_eq!(
            cluster.backends[0].object("dst", "b"),
            cluster.backends[0].object("src", "a")
        );
        assert!(cluster.backends[1].object("dst", "b").is_none());
        assert!(cluster.backends[2].object("dst", "b").is_none());
    }

    #[tokio::test]
    async fn test_copy_rejects_bad_source() {
        let cluster = Cluster::new();
        let orchestrator = cluster.orchestrator(fast_options());
        let err = CopyObjectCommand::new("dst", "b", "no-separator")
            .resolve(&orchestrator)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(cluster.backends[0].request_count(), 0);
    }

    #[tokio::test]
    async fn test_native_request_round_trip() {
        let cluster = Cluster::new();
        let orchestrator = cluster.orchestrator(fast_options());
        orchestrator.create_bucket("site").await.unwrap();

        let policy = r#"{"Version":"2012-10-17","Statement":[]}"#;
        NativeBucketCommand::new(
            NativeRequest::new(NativeMethod::Put, "site")
                .subresource(Subresource::Policy)
                .body(policy),
        )
        .resolve(&orchestrator)
        .await
        .unwrap();

        let response = NativeBucketCommand::new(
            NativeRequest::new(NativeMethod::Get, "site").subresource(Subresource::Policy),
        )
        .resolve(&orchestrator)
        .await
        .unwrap();
        assert_eq!(response.backend, BackendKind::Aws);
        assert_eq!(response.text(), policy);
    }

    #[tokio::test]
    async fn test_native_requires_distinguished_backend() {
        let cluster = Cluster::new();
        let orchestrator = cluster.orchestrator_without_native(fast_options());
        let err = NativeBucketCommand::new(NativeRequest::new(NativeMethod::Get, "site"))
            .resolve(&orchestrator)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_passthrough_commands_time_out() {
        let cluster = Cluster::new();
        let orchestrator = cluster.orchestrator(ClientOptions {
            request_timeout: Duration::from_secs(5),
            ..fast_options()
        });
        orchestrator.create_bucket("b").await.unwrap();
        orchestrator.put_object("b", "a", b"data").await.unwrap();

        cluster.backends[0].set_latency(Duration::from_secs(3600));
        let started = tokio::time::Instant::now();

        let err = CopyObjectCommand::new("b", "c", "b/a")
            .resolve(&orchestrator)
            .await
            .unwrap_err();
        assert_eq!(err.failed_backends(), vec![BackendKind::Aws]);
        assert!(err.to_string().contains("request timed out"), "{err}");

        let err = NativeBucketCommand::new(NativeRequest::new(NativeMethod::Head, "b"))
            .resolve(&orchestrator)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("request timed out"), "{err}");

        assert!(started.elapsed() < Duration::from_secs(60));
    }
}
