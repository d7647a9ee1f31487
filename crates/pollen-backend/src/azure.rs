//! Azure Blob Storage adapter
//!
//! Buckets map to containers and objects to block blobs. Requests go through
//! the `azure_storage_blobs` client, authorized with the account's shared key.

use crate::adapter::StorageBackend;
use crate::native::NativeClient;
use async_trait::async_trait;
use azure_core::error::ErrorKind;
use azure_storage::{CloudLocation, ConnectionString, StorageCredentials};
use azure_storage_blobs::blob::CopyStatus;
use azure_storage_blobs::prelude::*;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures::StreamExt;
use pollen_common::{AzureConfig, BackendKind, Error, Result};
use std::time::Duration;
use tracing::debug;

pub use azure_storage_blobs::prelude::BlobServiceClient;

/// Polls of a pending server-side copy before giving up
const COPY_POLL_ATTEMPTS: u32 = 30;
const COPY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Azure Blob implementation of [`StorageBackend`]
pub struct AzureBackend {
    client: BlobServiceClient,
    account: String,
}

impl std::fmt::Debug for AzureBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureBackend")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl AzureBackend {
    /// Create the adapter; fails fast on missing credentials
    ///
    /// A connection string wins over an account name and key.
    /// `UseDevelopmentStorage=true` targets the local storage emulator.
    pub fn new(config: &AzureConfig) -> Result<Self> {
        let endpoint = non_empty(config.endpoint.as_deref()).map(str::to_string);

        if let Some(text) = non_empty(config.connection_string.as_deref()) {
            if text
                .to_ascii_lowercase()
                .replace(' ', "")
                .contains("usedevelopmentstorage=true")
            {
                return Ok(Self {
                    client: ClientBuilder::emulator().blob_service_client(),
                    account: "devstoreaccount1".to_string(),
                });
            }

            let parsed = ConnectionString::new(text).map_err(|e| {
                Error::configuration(format!("invalid azure connection string: {e}"))
            })?;
            let account = parsed
                .account_name
                .ok_or_else(|| Error::configuration("azure connection string has no AccountName"))?
                .to_string();
            if let Some(key) = parsed.account_key {
                check_account_key(key)?;
            }
            let credentials = parsed.storage_credentials().map_err(|e| {
                Error::configuration(format!("azure connection string has no usable credentials: {e}"))
            })?;
            let endpoint = endpoint.or_else(|| parsed.blob_endpoint.map(str::to_string));
            return Ok(Self::build(account, credentials, endpoint));
        }

        let account = non_empty(config.account_name.as_deref())
            .ok_or_else(|| {
                Error::configuration(
                    "azure.connection_string or azure.account_name is required for the azure backend",
                )
            })?
            .to_string();
        let key = non_empty(config.account_key.as_deref()).ok_or_else(|| {
            Error::configuration("azure.account_key is required for the azure backend")
        })?;
        check_account_key(key)?;

        let credentials = StorageCredentials::access_key(account.clone(), key.to_string());
        Ok(Self::build(account, credentials, endpoint))
    }

    fn build(account: String, credentials: StorageCredentials, endpoint: Option<String>) -> Self {
        let builder = match endpoint {
            Some(uri) => ClientBuilder::with_location(
                CloudLocation::Custom {
                    account: account.clone(),
                    uri: uri.trim_end_matches('/').to_string(),
                },
                credentials,
            ),
            None => ClientBuilder::new(account.clone(), credentials),
        };
        Self {
            client: builder.blob_service_client(),
            account,
        }
    }

    #[must_use]
    pub const fn client(&self) -> &BlobServiceClient {
        &self.client
    }

    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    fn blob(&self, container: &str, blob: &str) -> BlobClient {
        self.client.container_client(container).blob_client(blob)
    }

    /// Wait for an asynchronous copy to leave the `pending` state
    async fn wait_for_copy(&self, container: &str, blob: &str) -> Result<()> {
        let client = self.blob(container, blob);
        for _ in 0..COPY_POLL_ATTEMPTS {
            tokio::time::sleep(COPY_POLL_INTERVAL).await;
            let properties = client
                .get_properties()
                .into_future()
                .await
                .map_err(sdk_error)?;
            match properties.blob.properties.copy_status {
                Some(CopyStatus::Pending) => continue,
                Some(CopyStatus::Success) | None => return Ok(()),
                Some(other) => {
                    return Err(Error::backend(
                        BackendKind::Azure,
                        None,
                        format!("copy to {container}/{blob} ended with status {other:?}"),
                    ));
                }
            }
        }
        Err(Error::backend(
            BackendKind::Azure,
            None,
            format!("copy to {container}/{blob} still pending"),
        ))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Shared keys are base64; a typo should fail at construction, not on first use
fn check_account_key(key: &str) -> Result<()> {
    BASE64
        .decode(key.as_bytes())
        .map(|_| ())
        .map_err(|e| Error::configuration(format!("azure account key is not base64: {e}")))
}

/// Map an SDK error, keeping the HTTP status when the service answered
fn sdk_error(err: azure_core::Error) -> Error {
    match err.kind() {
        ErrorKind::HttpResponse { status, error_code } => {
            let status = *status as u16;
            let message = match error_code {
                Some(code) => format!("{code}: {err}"),
                None => err.to_string(),
            };
            Error::backend(BackendKind::Azure, Some(status), message)
        }
        _ => Error::backend(BackendKind::Azure, None, err.to_string()),
    }
}

#[async_trait]
impl StorageBackend for AzureBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Azure
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .container_client(bucket)
            .create()
            .into_future()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn remove_empty_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .container_client(bucket)
            .delete()
            .into_future()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut pages = self.client.list_containers().into_stream();
        while let Some(page) = pages.next().await {
            let page = page.map_err(sdk_error)?;
            names.extend(page.containers.into_iter().map(|c| c.name));
        }
        Ok(names)
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        self.blob(bucket, key)
            .put_block_blob(body)
            .content_type("application/octet-stream")
            .into_future()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let body = self
            .blob(bucket, key)
            .get_content()
            .await
            .map_err(sdk_error)?;
        Ok(Bytes::from(body))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.blob(bucket, key)
            .delete()
            .into_future()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut pages = self.client.container_client(bucket).list_blobs().into_stream();
        while let Some(page) = pages.next().await {
            let page = page.map_err(sdk_error)?;
            names.extend(page.blobs.blobs().map(|blob| blob.name.clone()));
        }
        debug!("Azure listed {} blobs in {}", names.len(), bucket);
        Ok(names)
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        let source = self.blob(src_bucket, src_key).url().map_err(sdk_error)?;
        let response = self
            .blob(dst_bucket, dst_key)
            .copy(source)
            .into_future()
            .await
            .map_err(sdk_error)?;

        if matches!(response.copy_status, CopyStatus::Pending) {
            debug!("Azure copy to {}/{} pending", dst_bucket, dst_key);
            self.wait_for_copy(dst_bucket, dst_key).await?;
        }
        Ok(())
    }

    fn native(&self) -> NativeClient<'_> {
        NativeClient::Azure(&self.client)
    }
}
