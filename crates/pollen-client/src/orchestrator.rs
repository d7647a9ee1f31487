//! Distribution orchestrator
//!
//! Fans every operation out to the registry's adapters and gathers the
//! results back.
//!
//! ```text
//!                 put(bucket, key, payload)
//!                          │
//!                 ShareCodec::split (n, k)
//!          ┌───────────────┼───────────────┐
//!          ▼               ▼               ▼
//!     share 0 → aws   share 1 → azure  share 2 → gcs
//!
//!                 get(bucket, key)
//!     aws ─┐        azure ─┐        gcs ─┐
//!          └── k shares of one write ─────┴─→ ShareCodec::combine
//! ```
//!
//! Placement is positional: share `i` always goes to adapter `i` of the
//! registry, and reads decode each body against the position it came from.

use bytes::Bytes;
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use pollen_backend::{BackendRegistry, StorageBackend};
use pollen_common::{
    BackendFailure, BackendKind, Error, PartialPutPolicy, PollenConfig, Result, RetryConfig,
    SharingConfig,
};
use pollen_sharing::{Share, ShareCodec, WriteId};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default per-backend request timeout
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime options of a client session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientOptions {
    /// Reconstruction threshold (k)
    pub threshold: u8,
    /// Upper bound on every single adapter call
    pub request_timeout: Duration,
    pub read_retry: RetryConfig,
    pub partial_put: PartialPutPolicy,
}

impl ClientOptions {
    #[must_use]
    pub fn from_config(config: &PollenConfig) -> Self {
        Self {
            threshold: config.threshold,
            request_timeout: config.request_timeout(),
            read_retry: config.read_retry,
            partial_put: config.partial_put,
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            threshold: 2,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            read_retry: RetryConfig::default(),
            partial_put: PartialPutPolicy::Keep,
        }
    }
}

/// What a [`ListReport`] enumerates
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListSubject {
    Buckets,
    Objects { bucket: String },
}

/// Names returned by one backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendListing {
    pub backend: BackendKind,
    pub names: Vec<String>,
}

/// Per-backend result of a mirrored listing
#[derive(Debug)]
pub struct ListReport {
    pub subject: ListSubject,
    /// Successful listings, in registry order
    pub listings: Vec<BackendListing>,
    pub failures: Vec<BackendFailure>,
}

impl ListReport {
    /// Every backend answered
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Listing of one backend, if it answered
    #[must_use]
    pub fn names(&self, backend: BackendKind) -> Option<&[String]> {
        self.listings
            .iter()
            .find(|l| l.backend == backend)
            .map(|l| l.names.as_slice())
    }

    /// Text report, one block per backend
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for listing in &self.listings {
            let provider = listing.backend.display_name();
            let _ = match &self.subject {
                ListSubject::Buckets => writeln!(out, "{provider} Buckets:"),
                ListSubject::Objects { bucket } => {
                    writeln!(out, "{bucket} objects in {provider}:")
                }
            };
            for name in &listing.names {
                let _ = writeln!(out, "\t{name}");
            }
        }
        for failure in &self.failures {
            let _ = writeln!(out, "{} failed: {}", failure.backend.display_name(), failure.error);
        }
        out
    }
}

/// Fan-out / fan-in engine over one backend registry
pub struct Orchestrator {
    registry: Arc<BackendRegistry>,
    codec: ShareCodec,
    options: ClientOptions,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("layout", &self.codec.config())
            .field("options", &self.options)
            .finish()
    }
}

impl Orchestrator {
    /// One share per registered backend, `options.threshold` of them needed
    pub fn new(registry: Arc<BackendRegistry>, options: ClientOptions) -> Result<Self> {
        let shares = u8::try_from(registry.len()).map_err(|_| {
            Error::configuration(format!("too many backends: {}", registry.len()))
        })?;
        let codec = ShareCodec::new(SharingConfig::new(shares, options.threshold))?;
        info!(
            "Orchestrator over {:?} with {} sharing",
            registry.kinds(),
            codec.config()
        );
        Ok(Self {
            registry,
            codec,
            options,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    #[must_use]
    pub const fn codec(&self) -> &ShareCodec {
        &self.codec
    }

    #[must_use]
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Run one adapter call under the request timeout
    pub(crate) async fn call<T>(
        &self,
        backend: BackendKind,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.options.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::backend(backend, None, "request timed out")),
        }
    }

    /// Issue the same call to every adapter and wait for all of them
    async fn fan_out<T, F, Fut>(&self, f: F) -> Vec<(BackendKind, Result<T>)>
    where
        F: Fn(Arc<dyn StorageBackend>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let calls = self.registry.adapters().iter().map(|adapter| {
            let backend = adapter.kind();
            let fut = f(Arc::clone(adapter));
            async move { (backend, self.call(backend, fut).await) }
        });
        join_all(calls).await
    }

    /// Mirrored call that must succeed on every backend
    async fn mirror<F, Fut>(&self, operation: &'static str, f: F) -> Result<()>
    where
        F: Fn(Arc<dyn StorageBackend>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let results = self.fan_out(f).await;
        let (succeeded, failures) = partition(results);
        if failures.is_empty() {
            info!("{} succeeded on {:?}", operation, succeeded);
            return Ok(());
        }

        for failure in &failures {
            warn!("{} failed on {}: {}", operation, failure.backend, failure.error);
        }
        Err(Error::PartialFanOut {
            operation,
            succeeded,
            failures,
        })
    }

    /// Mirrored listing; failures are reported, not raised
    async fn list<F, Fut>(&self, subject: ListSubject, f: F) -> ListReport
    where
        F: Fn(Arc<dyn StorageBackend>) -> Fut,
        Fut: Future<Output = Result<Vec<String>>>,
    {
        let mut listings = Vec::new();
        let mut failures = Vec::new();
        for (backend, result) in self.fan_out(f).await {
            match result {
                Ok(names) => listings.push(BackendListing { backend, names }),
                Err(e) => {
                    warn!("Listing on {} failed: {}", backend, e);
                    failures.push(BackendFailure::new(backend, e));
                }
            }
        }
        ListReport {
            subject,
            listings,
            failures,
        }
    }

    pub async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.mirror("create bucket", |adapter| async move {
            adapter.create_bucket(bucket).await
        })
        .await
    }

    /// Empty and delete the bucket on every backend
    pub async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.mirror("delete bucket", |adapter| async move {
            adapter.delete_bucket(bucket).await
        })
        .await
    }

    pub async fn list_buckets(&self) -> ListReport {
        self.list(ListSubject::Buckets, |adapter| async move {
            adapter.list_buckets().await
        })
        .await
    }

    /// Split the payload and write share `i` to backend `i`
    ///
    /// Every write must succeed. On failure the written shares are kept or
    /// rolled back according to [`PartialPutPolicy`], and the error lists
    /// which backends hold a share.
    pub async fn put_object(&self, bucket: &str, key: &str, payload: &[u8]) -> Result<()> {
        let shares = self.codec.split(payload)?;
        debug!(
            "Putting {}/{}: {} bytes as {} shares",
            bucket,
            key,
            payload.len(),
            shares.len()
        );

        let writes = self
            .registry
            .adapters()
            .iter()
            .zip(&shares)
            .map(|(adapter, share)| {
                let backend = adapter.kind();
                let body = share.to_body();
                async move {
                    let result = self
                        .call(backend, adapter.put_object(bucket, key, body))
                        .await;
                    (backend, result)
                }
            });
        let (succeeded, failures) = partition(join_all(writes).await);

        if failures.is_empty() {
            info!("Put {}/{} on {:?}", bucket, key, succeeded);
            return Ok(());
        }

        for failure in &failures {
            warn!("Share write of {}/{} failed on {}: {}", bucket, key, failure.backend, failure.error);
        }
        if self.options.partial_put == PartialPutPolicy::Rollback {
            self.rollback(bucket, key, &succeeded).await;
        }
        Err(Error::PartialFanOut {
            operation: "put object",
            succeeded,
            failures,
        })
    }

    /// Best-effort delete of shares written by a failed put
    async fn rollback(&self, bucket: &str, key: &str, written: &[BackendKind]) {
        let deletes = written
            .iter()
            .filter_map(|kind| self.registry.get(*kind))
            .map(|adapter| {
                let backend = adapter.kind();
                async move {
                    let result = self
                        .call(backend, adapter.delete_object(bucket, key))
                        .await;
                    (backend, result)
                }
            });
        for (backend, result) in join_all(deletes).await {
            match result {
                Ok(()) => debug!("Rolled back share of {}/{} on {}", bucket, key, backend),
                Err(e) => warn!("Rollback of {}/{} on {} failed: {}", bucket, key, backend, e),
            }
        }
    }

    /// Read local file and put it; the key defaults to the file name
    pub async fn put_file(&self, bucket: &str, path: &Path, key: Option<&str>) -> Result<()> {
        let key = match key {
            Some(key) => key.to_string(),
            None => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::invalid_argument(format!("{} has no file name", path.display()))
                })?,
        };
        let payload = tokio::fs::read(path).await?;
        self.put_object(bucket, &key, &payload).await
    }

    /// Read shares concurrently and reconstruct from `k` shares of one write
    ///
    /// Shares are grouped by write id as they arrive. Once a group holds `k`
    /// shares it is combined; if that fails the remaining reads continue and
    /// other subsets are tried. Reads still outstanding after a successful
    /// combine are dropped.
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let required = self.codec.threshold();
        let mut reads: FuturesUnordered<_> = self
            .registry
            .adapters()
            .iter()
            .enumerate()
            .map(|(position, adapter)| async move {
                let result = self
                    .read_share(adapter.as_ref(), position, bucket, key)
                    .await;
                (adapter.kind(), result)
            })
            .collect();

        let mut writes: HashMap<WriteId, Vec<(BackendKind, Share)>> = HashMap::new();
        let mut failures = Vec::new();
        let mut combine_error = None;
        while let Some((backend, result)) = reads.next().await {
            let share = match result {
                Ok(share) => share,
                Err(e) => {
                    warn!("Share read of {}/{} failed on {}: {}", bucket, key, backend, e);
                    failures.push(BackendFailure::new(backend, e));
                    continue;
                }
            };
            let group = writes.entry(share.write_id).or_default();
            group.push((backend, share));
            if group.len() < required {
                continue;
            }

            match self.combine_with_newest(group) {
                Ok(payload) => {
                    debug!("Reconstructed {}/{} ({} bytes)", bucket, key, payload.len());
                    return Ok(Bytes::from(payload));
                }
                Err(e) => {
                    warn!("Combining shares of {}/{} failed: {}", bucket, key, e);
                    combine_error = Some(e);
                }
            }
        }
        drop(reads);

        if let Some(e) = combine_error {
            return Err(e);
        }

        let largest = writes
            .iter()
            .max_by_key(|(_, group)| group.len())
            .map(|(id, _)| *id);
        let mut available = 0;
        for (id, group) in writes {
            if Some(id) == largest {
                available = group.len();
                continue;
            }
            for (backend, _) in group {
                failures.push(BackendFailure::new(
                    backend,
                    Error::reconstruction(format!("share belongs to a different write ({id})")),
                ));
            }
        }
        Err(Error::InsufficientShares {
            available,
            required,
            failures,
        })
    }

    /// Combine `k`-subsets of one write's shares that include the share
    /// added last, returning the first reconstruction that verifies
    fn combine_with_newest(&self, group: &[(BackendKind, Share)]) -> Result<Vec<u8>> {
        let required = self.codec.threshold();
        let Some(((_, newest), earlier)) = group.split_last() else {
            return Err(Error::reconstruction("no shares to combine"));
        };

        let mut last_error = None;
        for subset in combinations(earlier.len(), required - 1) {
            let mut shares: Vec<Share> = subset.iter().map(|&i| earlier[i].1.clone()).collect();
            shares.push(newest.clone());
            match self.codec.combine(&shares) {
                Ok(payload) => return Ok(payload),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| Error::reconstruction("no shares to combine")))
    }

    /// Fetch and decode the share stored at `position`, retrying transient
    /// and not-found failures
    async fn read_share(
        &self,
        adapter: &dyn StorageBackend,
        position: usize,
        bucket: &str,
        key: &str,
    ) -> Result<Share> {
        let backend = adapter.kind();
        let retry = self.options.read_retry;
        let mut attempt = 1;
        loop {
            match self.call(backend, adapter.get_object(bucket, key)).await {
                Ok(body) => return self.codec.decode_share(position, &body),
                Err(e) if attempt < retry.attempts && (e.is_retryable() || e.is_not_found()) => {
                    debug!(
                        "Retrying read of {}/{} on {} (attempt {}): {}",
                        bucket, key, backend, attempt, e
                    );
                    attempt += 1;
                    tokio::time::sleep(retry.delay()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Delete the object's share on every backend
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.mirror("delete object", |adapter| async move {
            adapter.delete_object(bucket, key).await
        })
        .await
    }

    pub async fn list_objects(&self, bucket: &str) -> ListReport {
        self.list(
            ListSubject::Objects {
                bucket: bucket.to_string(),
            },
            |adapter| async move { adapter.list_objects(bucket).await },
        )
        .await
    }
}

/// Index sets of size `k` drawn from `0..n`, in lexicographic order
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k > n {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut current: Vec<usize> = (0..k).collect();
    loop {
        out.push(current.clone());
        let Some(i) = (0..k).rev().find(|&i| current[i] < n - k + i) else {
            return out;
        };
        current[i] += 1;
        for j in i + 1..k {
            current[j] = current[j - 1] + 1;
        }
    }
}

fn partition(results: Vec<(BackendKind, Result<()>)>) -> (Vec<BackendKind>, Vec<BackendFailure>) {
    let mut succeeded = Vec::new();
    let mut failures = Vec::new();
    for (backend, result) in results {
        match result {
            Ok(()) => succeeded.push(backend),
            Err(e) => failures.push(BackendFailure::new(backend, e)),
        }
    }
    (succeeded, failures)
}
