//! Amazon S3 adapter
//!
//! Speaks the S3 REST API directly: SigV4-signed requests, XML responses,
//! ListObjectsV2 pagination and server-side copy.

mod client;
pub mod sigv4;
mod xml;

pub use client::S3Client;

use crate::adapter::StorageBackend;
use crate::http;
use crate::native::NativeClient;
use async_trait::async_trait;
use bytes::Bytes;
use client::S3Request;
use pollen_common::{AwsConfig, BackendKind, Error, Result};
use reqwest::Method;
use crate::signing::uri_encode;
use tracing::debug;

/// Region whose buckets take no `LocationConstraint`
const DEFAULT_S3_REGION: &str = "us-east-1";

/// S3 implementation of [`StorageBackend`]
#[derive(Debug)]
pub struct S3Backend {
    client: S3Client,
}

impl S3Backend {
    /// Create the adapter; fails fast on missing credentials
    pub fn new(config: &AwsConfig) -> Result<Self> {
        Ok(Self {
            client: S3Client::new(config)?,
        })
    }

    #[must_use]
    pub const fn client(&self) -> &S3Client {
        &self.client
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::Aws
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut request = S3Request::new(Method::PUT).bucket(bucket);
        if self.client.region() != DEFAULT_S3_REGION {
            let body = quick_xml::se::to_string(&xml::CreateBucketConfiguration::new(
                self.client.region(),
            ))
            .map_err(|e| Error::backend(self.kind(), None, format!("xml encode: {e}")))?;
            request = request
                .header("content-type", "application/xml")
                .body(Bytes::from(body));
        }
        self.client.execute(request).await?;
        Ok(())
    }

    async fn remove_empty_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .execute(S3Request::new(Method::DELETE).bucket(bucket))
            .await?;
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        let response = self.client.execute(S3Request::new(Method::GET)).await?;
        let body = http::read_text(self.kind(), response).await?;
        let result: xml::ListAllMyBucketsResult = quick_xml::de::from_str(&body)
            .map_err(|e| Error::backend(self.kind(), None, format!("invalid bucket list: {e}")))?;
        Ok(result.buckets.bucket.into_iter().map(|b| b.name).collect())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        let request = S3Request::new(Method::PUT)
            .bucket(bucket)
            .key(key)
            .header("content-type", "application/octet-stream")
            .body(body);
        self.client.execute(request).await?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let response = self
            .client
            .execute(S3Request::new(Method::GET).bucket(bucket).key(key))
            .await?;
        http::read_body(self.kind(), response).await
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .execute(S3Request::new(Method::DELETE).bucket(bucket).key(key))
            .await?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = S3Request::new(Method::GET)
                .bucket(bucket)
                .query("list-type", "2");
            if let Some(token) = continuation.take() {
                request = request.query("continuation-token", token);
            }

            let response = self.client.execute(request).await?;
            let body = http::read_text(self.kind(), response).await?;
            let page: xml::ListBucketResult = quick_xml::de::from_str(&body).map_err(|e| {
                Error::backend(self.kind(), None, format!("invalid object list: {e}"))
            })?;

            keys.extend(page.contents.into_iter().map(|c| c.key));
            match page.next_continuation_token {
                Some(token) if page.is_truncated => continuation = Some(token),
                _ => break,
            }
        }

        debug!("S3 listed {} objects in {}", keys.len(), bucket);
        Ok(keys)
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        let source = format!("/{}/{}", src_bucket, uri_encode(src_key, false));
        let response = self
            .client
            .execute(
                S3Request::new(Method::PUT)
                    .bucket(dst_bucket)
                    .key(dst_key)
                    .header("x-amz-copy-source", source),
            )
            .await?;

        // CopyObject can fail after the 200 status line has been sent
        let body = http::read_text(self.kind(), response).await?;
        if let Some(message) = xml::describe_error(&body) {
            return Err(Error::backend(self.kind(), None, message));
        }
        Ok(())
    }

    fn native(&self) -> NativeClient<'_> {
        NativeClient::S3(&self.client)
    }
}
