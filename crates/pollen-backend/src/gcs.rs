//! Google Cloud Storage adapter
//!
//! Object reads and writes go through the `Storage` client; bucket
//! management, listings, deletes and rewrites go through `StorageControl`.

use crate::adapter::StorageBackend;
use crate::native::NativeClient;
use async_trait::async_trait;
use bytes::Bytes;
use google_cloud_auth::credentials::{self, Credentials, anonymous, service_account, user_account};
use google_cloud_gax::error::rpc::Code;
use google_cloud_gax::paginator::ItemPaginator as _;
use google_cloud_storage::client::{Storage, StorageControl};
use google_cloud_storage::model::Bucket;
use pollen_common::{BackendKind, Error, GcsConfig, Result};
use tracing::debug;

/// GCS implementation of [`StorageBackend`]
pub struct GcsBackend {
    storage: Storage,
    control: StorageControl,
    project_id: String,
}

impl std::fmt::Debug for GcsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcsBackend")
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl GcsBackend {
    /// Create the adapter; fails fast on a missing project or bad credentials
    ///
    /// Credentials come from `credentials_file` (service account or
    /// authorized user JSON), else Application Default Credentials. With an
    /// `endpoint` override and no file the client is anonymous, which is what
    /// local emulators expect.
    pub async fn new(config: &GcsConfig) -> Result<Self> {
        let project_id = config
            .project_id
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::configuration("gcs.project_id is required for the gcs backend"))?;
        let credentials = load_credentials(config)?;

        let mut storage = Storage::builder().with_credentials(credentials.clone());
        let mut control = StorageControl::builder().with_credentials(credentials);
        if let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.is_empty()) {
            storage = storage.with_endpoint(endpoint);
            control = control.with_endpoint(endpoint);
        }
        let storage = storage
            .build()
            .await
            .map_err(|e| Error::configuration(format!("gcs: failed to build storage client: {e}")))?;
        let control = control
            .build()
            .await
            .map_err(|e| Error::configuration(format!("gcs: failed to build control client: {e}")))?;

        Ok(Self {
            storage,
            control,
            project_id,
        })
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    #[must_use]
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub const fn control(&self) -> &StorageControl {
        &self.control
    }
}

fn load_credentials(config: &GcsConfig) -> Result<Credentials> {
    let Some(path) = config.credentials_file.as_deref().filter(|p| !p.is_empty()) else {
        if config.endpoint.as_deref().is_some_and(|e| !e.is_empty()) {
            return Ok(anonymous::Builder::new().build());
        }
        return credentials::Builder::default().build().map_err(|e| {
            Error::configuration(format!("gcs: no application default credentials: {e}"))
        });
    };

    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::configuration(format!("gcs: cannot read {path}: {e}")))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| Error::configuration(format!("gcs: {path} is not JSON: {e}")))?;
    let built = match json.get("type").and_then(serde_json::Value::as_str) {
        Some("authorized_user") => user_account::Builder::new(json).build(),
        Some("service_account") => service_account::Builder::new(json).build(),
        other => {
            return Err(Error::configuration(format!(
                "gcs: unsupported credentials type {other:?} in {path}"
            )));
        }
    };
    built.map_err(|e| Error::configuration(format!("gcs: invalid credentials in {path}: {e}")))
}

/// Resource name of a bucket in the global project namespace
fn bucket_name(bucket: &str) -> String {
    format!("projects/_/buckets/{bucket}")
}

/// HTTP status equivalent of a gRPC status code
const fn rpc_status(code: Code) -> Option<u16> {
    match code {
        Code::InvalidArgument | Code::OutOfRange => Some(400),
        Code::Unauthenticated => Some(401),
        Code::PermissionDenied => Some(403),
        Code::NotFound => Some(404),
        Code::AlreadyExists | Code::Aborted => Some(409),
        Code::FailedPrecondition => Some(412),
        Code::ResourceExhausted => Some(429),
        Code::Internal => Some(500),
        Code::Unavailable => Some(503),
        Code::DeadlineExceeded => Some(504),
        _ => None,
    }
}

/// Map an SDK error, keeping the HTTP status when the service answered
fn sdk_error(err: google_cloud_gax::error::Error) -> Error {
    let status = err
        .http_status_code()
        .or_else(|| err.status().and_then(|s| rpc_status(s.code.clone())));
    Error::backend(BackendKind::Gcs, status, err.to_string())
}

#[async_trait]
impl StorageBackend for GcsBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gcs
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.control
            .create_bucket()
            .set_parent("projects/_")
            .set_bucket_id(bucket)
            .set_bucket(Bucket::new().set_project(format!("projects/{}", self.project_id)))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn remove_empty_bucket(&self, bucket: &str) -> Result<()> {
        self.control
            .delete_bucket()
            .set_name(bucket_name(bucket))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut buckets = self
            .control
            .list_buckets()
            .set_parent(format!("projects/{}", self.project_id))
            .by_item();
        while let Some(bucket) = buckets.next().await {
            let bucket = bucket.map_err(sdk_error)?;
            let name = if bucket.bucket_id.is_empty() {
                bucket.name.rsplit('/').next().unwrap_or_default().to_string()
            } else {
                bucket.bucket_id
            };
            names.push(name);
        }
        Ok(names)
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        self.storage
            .write_object(bucket_name(bucket), key, body)
            .send_buffered()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let mut reader = self
            .storage
            .read_object(bucket_name(bucket), key)
            .send()
            .await
            .map_err(sdk_error)?;
        let mut contents = Vec::new();
        while let Some(chunk) = reader.next().await {
            contents.extend_from_slice(&chunk.map_err(sdk_error)?);
        }
        Ok(Bytes::from(contents))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.control
            .delete_object()
            .set_bucket(bucket_name(bucket))
            .set_object(key)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut objects = self
            .control
            .list_objects()
            .set_parent(bucket_name(bucket))
            .by_item();
        while let Some(object) = objects.next().await {
            names.push(object.map_err(sdk_error)?.name);
        }
        debug!("GCS listed {} objects in {}", names.len(), bucket);
        Ok(names)
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        // Large or cross-location rewrites complete over several calls
        let mut token = String::new();
        loop {
            let response = self
                .control
                .rewrite_object()
                .set_source_bucket(bucket_name(src_bucket))
                .set_source_object(src_key)
                .set_destination_bucket(bucket_name(dst_bucket))
                .set_destination_name(dst_key)
                .set_rewrite_token(token)
                .send()
                .await
                .map_err(sdk_error)?;
            if response.done {
                return Ok(());
            }
            if response.rewrite_token.is_empty() {
                return Err(Error::backend(
                    self.kind(),
                    None,
                    "rewrite not done and no rewrite token",
                ));
            }
            token = response.rewrite_token;
        }
    }

    fn native(&self) -> NativeClient<'_> {
        NativeClient::Gcs(&self.control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_project() {
        let err = GcsBackend::new(&GcsConfig::default()).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("gcs.project_id"));
    }

    #[tokio::test]
    async fn test_bad_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");

        let config = GcsConfig {
            project_id: Some("my-project".into()),
            credentials_file: Some(path.to_string_lossy().into_owned()),
            endpoint: None,
        };
        let err = GcsBackend::new(&config).await.unwrap_err();
        assert!(err.to_string().contains("cannot read"), "{err}");

        std::fs::write(&path, r#"{"type": "external_account"}"#).unwrap();
        let err = GcsBackend::new(&config).await.unwrap_err();
        assert!(err.to_string().contains("unsupported credentials type"), "{err}");

        std::fs::write(&path, "not json").unwrap();
        let err = GcsBackend::new(&config).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_bucket_name() {
        assert_eq!(bucket_name("photos"), "projects/_/buckets/photos");
    }

    #[test]
    fn test_rpc_status() {
        assert_eq!(rpc_status(Code::NotFound), Some(404));
        assert_eq!(rpc_status(Code::AlreadyExists), Some(409));
        assert_eq!(rpc_status(Code::Unavailable), Some(503));
        assert_eq!(rpc_status(Code::Unknown), None);
        let err = Error::backend(BackendKind::Gcs, rpc_status(Code::NotFound), "missing");
        assert!(err.is_not_found());
    }
}
