//! In-memory storage backend
//!
//! Behaves like a small S3: 404 for missing buckets and keys, 409 for bucket
//! conflicts. It can impersonate any [`BackendKind`] and supports fault
//! injection (offline, added latency), which makes it the test double for
//! every fan-out scenario.

use crate::adapter::StorageBackend;
use crate::native::{NativeClient, NativeMethod, NativeResponse, Subresource};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use pollen_common::{BackendKind, Error, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
struct MemoryBucket {
    objects: BTreeMap<String, Bytes>,
    /// `(key, subresource)` → document; `key` is empty for bucket subresources
    subresources: BTreeMap<(String, Subresource), Bytes>,
}

/// In-memory implementation of [`StorageBackend`]
#[derive(Debug)]
pub struct MemoryBackend {
    kind: BackendKind,
    buckets: RwLock<BTreeMap<String, MemoryBucket>>,
    offline: AtomicBool,
    latency_ms: AtomicU64,
    requests: AtomicUsize,
    shut_down: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend answering as `kind`
    #[must_use]
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            buckets: RwLock::new(BTreeMap::new()),
            offline: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            requests: AtomicUsize::new(0),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with 503
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every subsequent call
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Number of calls received so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Read an object directly, bypassing fault injection
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets
            .read()
            .get(bucket)
            .and_then(|b| b.objects.get(key).cloned())
    }

    /// Write an object directly, creating the bucket if needed
    pub fn insert_object(&self, bucket: &str, key: &str, body: Bytes) {
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_default()
            .objects
            .insert(key.to_string(), body);
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.read().contains_key(bucket)
    }

    /// Simulated network round trip
    async fn enter(&self) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(self.error(503, "ServiceUnavailable: backend offline"));
        }
        Ok(())
    }

    fn error(&self, status: u16, message: impl Into<String>) -> Error {
        Error::backend(self.kind, Some(status), message)
    }

    fn no_such_bucket(&self, bucket: &str) -> Error {
        self.error(404, format!("NoSuchBucket: {bucket}"))
    }

    /// S3-style subresource request against the in-memory state
    pub async fn subresource_request(
        &self,
        method: NativeMethod,
        bucket: &str,
        key: Option<&str>,
        subresource: Option<Subresource>,
        body: Option<Bytes>,
    ) -> Result<NativeResponse> {
        self.enter().await?;
        let respond = |status: u16, body: Bytes| NativeResponse {
            backend: self.kind,
            status,
            body,
        };

        let mut buckets = self.buckets.write();
        let entry = buckets
            .get_mut(bucket)
            .ok_or_else(|| self.no_such_bucket(bucket))?;

        let Some(sub) = subresource else {
            return match (method, key) {
                (NativeMethod::Head, None) => Ok(respond(200, Bytes::new())),
                (NativeMethod::Head | NativeMethod::Get, Some(key)) => {
                    let body = entry
                        .objects
                        .get(key)
                        .cloned()
                        .ok_or_else(|| self.error(404, format!("NoSuchKey: {key}")))?;
                    if method == NativeMethod::Head {
                        Ok(respond(200, Bytes::new()))
                    } else {
                        Ok(respond(200, body))
                    }
                }
                (NativeMethod::Put, Some(key)) => {
                    entry
                        .objects
                        .insert(key.to_string(), body.unwrap_or_default());
                    Ok(respond(200, Bytes::new()))
                }
                (NativeMethod::Delete, Some(key)) => {
                    entry.objects.remove(key);
                    Ok(respond(204, Bytes::new()))
                }
                (method, None) => Err(Error::unsupported(format!(
                    "{method} on a bucket needs a subresource"
                ))),
            };
        };

        if let Some(key) = key {
            if !entry.objects.contains_key(key) {
                return Err(self.error(404, format!("NoSuchKey: {key}")));
            }
        }
        let slot = (key.unwrap_or_default().to_string(), sub);
        match method {
            NativeMethod::Get => entry
                .subresources
                .get(&slot)
                .cloned()
                .map(|doc| respond(200, doc))
                .ok_or_else(|| {
                    self.error(404, format!("NoSuchConfiguration: no {sub} configuration on {bucket}"))
                }),
            NativeMethod::Head => Ok(respond(
                if entry.subresources.contains_key(&slot) { 200 } else { 404 },
                Bytes::new(),
            )),
            NativeMethod::Put => {
                entry.subresources.insert(slot, body.unwrap_or_default());
                Ok(respond(200, Bytes::new()))
            }
            NativeMethod::Delete => {
                entry.subresources.remove(&slot);
                Ok(respond(204, Bytes::new()))
            }
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.enter().await?;
        if bucket.is_empty() {
            return Err(self.error(400, "InvalidBucketName: bucket name is empty"));
        }
        let mut buckets = self.buckets.write();
        if buckets.contains_key(bucket) {
            return Err(self.error(409, format!("BucketAlreadyOwnedByYou: {bucket}")));
        }
        buckets.insert(bucket.to_string(), MemoryBucket::default());
        Ok(())
    }

    async fn remove_empty_bucket(&self, bucket: &str) -> Result<()> {
        self.enter().await?;
        let mut buckets = self.buckets.write();
        match buckets.get(bucket) {
            None => Err(self.no_such_bucket(bucket)),
            Some(b) if !b.objects.is_empty() => {
                Err(self.error(409, format!("BucketNotEmpty: {bucket}")))
            }
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        self.enter().await?;
        Ok(self.buckets.read().keys().cloned().collect())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        self.enter().await?;
        let mut buckets = self.buckets.write();
        let entry = buckets
            .get_mut(bucket)
            .ok_or_else(|| self.no_such_bucket(bucket))?;
        entry.objects.insert(key.to_string(), body);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.enter().await?;
        let buckets = self.buckets.read();
        let entry = buckets
            .get(bucket)
            .ok_or_else(|| self.no_such_bucket(bucket))?;
        entry
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| self.error(404, format!("NoSuchKey: {key}")))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.enter().await?;
        let mut buckets = self.buckets.write();
        let entry = buckets
            .get_mut(bucket)
            .ok_or_else(|| self.no_such_bucket(bucket))?;
        entry.objects.remove(key);
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>> {
        self.enter().await?;
        let buckets = self.buckets.read();
        let entry = buckets
            .get(bucket)
            .ok_or_else(|| self.no_such_bucket(bucket))?;
        Ok(entry.objects.keys().cloned().collect())
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        self.enter().await?;
        let mut buckets = self.buckets.write();
        let body = buckets
            .get(src_bucket)
            .ok_or_else(|| self.no_such_bucket(src_bucket))?
            .objects
            .get(src_key)
            .cloned()
            .ok_or_else(|| self.error(404, format!("NoSuchKey: {src_key}")))?;
        buckets
            .get_mut(dst_bucket)
            .ok_or_else(|| self.no_such_bucket(dst_bucket))?
            .objects
            .insert(dst_key.to_string(), body);
        Ok(())
    }

    fn native(&self) -> NativeClient<'_> {
        NativeClient::Memory(self)
    }

    async fn shutdown(&self) -> Result<()> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}
