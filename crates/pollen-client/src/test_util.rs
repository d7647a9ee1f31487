//! In-memory three-backend cluster for tests

use crate::client::PollenClient;
use crate::orchestrator::{ClientOptions, Orchestrator};
use pollen_backend::{BackendRegistry, MemoryBackend, StorageBackend};
use pollen_common::{BackendKind, RetryConfig};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct Cluster {
    pub backends: Vec<Arc<MemoryBackend>>,
}

impl Cluster {
    /// aws, azure, gcs in that order
    pub fn new() -> Self {
        Self::from_backends(
            BackendKind::ALL
                .iter()
                .map(|kind| Arc::new(MemoryBackend::new(*kind)))
                .collect(),
        )
    }

    pub fn from_backends(backends: Vec<Arc<MemoryBackend>>) -> Self {
        Self { backends }
    }

    fn registry(&self, native: Option<BackendKind>) -> Arc<BackendRegistry> {
        let adapters = self
            .backends
            .iter()
            .map(|b| Arc::clone(b) as Arc<dyn StorageBackend>)
            .collect();
        Arc::new(BackendRegistry::from_adapters(adapters, native).unwrap())
    }

    pub fn orchestrator(&self, options: ClientOptions) -> Orchestrator {
        Orchestrator::new(self.registry(Some(BackendKind::Aws)), options).unwrap()
    }

    pub fn orchestrator_without_native(&self, options: ClientOptions) -> Orchestrator {
        Orchestrator::new(self.registry(None), options).unwrap()
    }

    pub fn client(&self, options: ClientOptions) -> PollenClient {
        PollenClient::from_registry(self.registry(Some(BackendKind::Aws)), options).unwrap()
    }
}

/// No read retries, short timeout
pub(crate) fn fast_options() -> ClientOptions {
    ClientOptions {
        request_timeout: Duration::from_secs(10),
        read_retry: RetryConfig::NONE,
        ..ClientOptions::default()
    }
}
