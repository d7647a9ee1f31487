//! Backend registry
//!
//! Builds the ordered adapter set for one client session. The order is the
//! share placement order: share `i` of every object lives on adapter `i`, so
//! the registry is immutable once built.

use crate::adapter::StorageBackend;
use crate::azure::AzureBackend;
use crate::gcs::GcsBackend;
use crate::s3::S3Backend;
use pollen_common::{BackendFailure, BackendKind, Error, PollenConfig, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Ordered set of storage adapters
pub struct BackendRegistry {
    adapters: Vec<Arc<dyn StorageBackend>>,
    native: Option<BackendKind>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.kinds())
            .field("native", &self.native)
            .finish()
    }
}

impl BackendRegistry {
    /// Build every configured adapter, in configuration order
    ///
    /// Validation and credential checks happen here, before any bucket or
    /// object request.
    pub async fn from_config(config: &PollenConfig) -> Result<Self> {
        config.validate()?;

        let mut adapters = Vec::with_capacity(config.backends.len());
        for kind in &config.backends {
            adapters.push(create_adapter(*kind, config).await?);
        }

        let registry = Self::from_adapters(adapters, config.native_backend)?;
        info!("Backend registry ready: {:?}", registry.kinds());
        Ok(registry)
    }

    /// Wrap pre-built adapters
    ///
    /// Rejects an empty list, duplicate identities and a required native
    /// backend that is not in the list.
    pub fn from_adapters(
        adapters: Vec<Arc<dyn StorageBackend>>,
        native: Option<BackendKind>,
    ) -> Result<Self> {
        if adapters.is_empty() {
            return Err(Error::configuration("at least one backend must be configured"));
        }

        let mut seen = HashSet::new();
        for adapter in &adapters {
            if !seen.insert(adapter.kind()) {
                return Err(Error::configuration(format!(
                    "backend '{}' is listed more than once",
                    adapter.kind()
                )));
            }
        }

        let registry = Self { adapters, native };
        if let Some(kind) = native {
            registry.resolve_native(kind)?;
        }
        Ok(registry)
    }

    /// Adapters in share placement order
    #[must_use]
    pub fn adapters(&self) -> &[Arc<dyn StorageBackend>] {
        &self.adapters
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<BackendKind> {
        self.adapters.iter().map(|a| a.kind()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Adapter for one identity, if configured
    #[must_use]
    pub fn get(&self, kind: BackendKind) -> Option<&Arc<dyn StorageBackend>> {
        self.adapters.iter().find(|a| a.kind() == kind)
    }

    /// Adapter for a distinguished backend; absent → `Error::Configuration`
    pub fn resolve_native(&self, kind: BackendKind) -> Result<&Arc<dyn StorageBackend>> {
        self.get(kind).ok_or_else(|| {
            Error::configuration(format!(
                "{kind} must be included in the backend list but got {:?}",
                self.kinds()
            ))
        })
    }

    /// The configured native passthrough backend
    pub fn native(&self) -> Result<&Arc<dyn StorageBackend>> {
        let kind = self
            .native
            .ok_or_else(|| Error::configuration("no native backend is configured"))?;
        self.resolve_native(kind)
    }

    #[must_use]
    pub const fn native_kind(&self) -> Option<BackendKind> {
        self.native
    }

    /// Release every adapter's connections
    ///
    /// All adapters are shut down even if some fail.
    pub async fn shutdown(&self) -> Result<()> {
        let mut succeeded = Vec::new();
        let mut failures = Vec::new();
        for adapter in &self.adapters {
            match adapter.shutdown().await {
                Ok(()) => succeeded.push(adapter.kind()),
                Err(e) => {
                    warn!("Shutdown of {} failed: {}", adapter.kind(), e);
                    failures.push(BackendFailure::new(adapter.kind(), e));
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::PartialFanOut {
                operation: "shutdown",
                succeeded,
                failures,
            })
        }
    }
}

/// Construct one adapter from its sub-configuration
pub async fn create_adapter(
    kind: BackendKind,
    config: &PollenConfig,
) -> Result<Arc<dyn StorageBackend>> {
    let missing = || {
        Error::configuration(format!(
            "{kind} backend is selected but has no [{kind}] configuration"
        ))
    };
    let adapter: Arc<dyn StorageBackend> = match kind {
        BackendKind::Aws => Arc::new(S3Backend::new(config.aws.as_ref().ok_or_else(missing)?)?),
        BackendKind::Azure => Arc::new(AzureBackend::new(
            config.azure.as_ref().ok_or_else(missing)?,
        )?),
        BackendKind::Gcs => Arc::new(GcsBackend::new(config.gcs.as_ref().ok_or_else(missing)?).await?),
    };
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use pollen_common::{AwsConfig, AzureConfig, GcsConfig};

    fn memory(kinds: &[BackendKind]) -> Vec<Arc<dyn StorageBackend>> {
        kinds
            .iter()
            .map(|k| Arc::new(MemoryBackend::new(*k)) as Arc<dyn StorageBackend>)
            .collect()
    }

    fn full_config() -> PollenConfig {
        PollenConfig {
            aws: Some(AwsConfig {
                access_key_id: Some("AKID".into()),
                secret_access_key: Some("secret".into()),
                ..AwsConfig::default()
            }),
            azure: Some(AzureConfig {
                connection_string: Some("UseDevelopmentStorage=true".into()),
                ..AzureConfig::default()
            }),
            gcs: Some(GcsConfig {
                project_id: Some("project".into()),
                credentials_file: None,
                endpoint: Some("http://127.0.0.1:4443".into()),
            }),
            ..PollenConfig::default()
        }
    }

    #[tokio::test]
    async fn test_from_config_preserves_order() {
        let mut config = full_config();
        config.backends = vec![BackendKind::Gcs, BackendKind::Aws, BackendKind::Azure];
        let registry = BackendRegistry::from_config(&config).await.unwrap();
        assert_eq!(
            registry.kinds(),
            vec![BackendKind::Gcs, BackendKind::Aws, BackendKind::Azure]
        );
        assert_eq!(registry.native().unwrap().kind(), BackendKind::Aws);
        assert!(matches!(
            registry.native().unwrap().native(),
            crate::NativeClient::S3(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_fast() {
        let mut config = full_config();
        config.gcs = None;
        let err = BackendRegistry::from_config(&config).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("gcs backend is selected"));

        let mut config = full_config();
        config.aws.as_mut().unwrap().secret_access_key = None;
        assert!(matches!(
            BackendRegistry::from_config(&config).await,
            Err(Error::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_native_backend_required() {
        let mut config = full_config();
        config.backends = vec![BackendKind::Azure, BackendKind::Gcs];
        let err = BackendRegistry::from_config(&config).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = BackendRegistry::from_adapters(
            memory(&[BackendKind::Azure, BackendKind::Gcs]),
            Some(BackendKind::Aws),
        )
        .unwrap_err();
        assert!(err.to_string().contains("aws must be included"));
    }

    #[test]
    fn test_from_adapters_validation() {
        assert!(BackendRegistry::from_adapters(Vec::new(), None).is_err());
        assert!(
            BackendRegistry::from_adapters(memory(&[BackendKind::Aws, BackendKind::Aws]), None)
                .is_err()
        );

        let registry =
            BackendRegistry::from_adapters(memory(&[BackendKind::Azure, BackendKind::Gcs]), None)
                .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.native().is_err());
        assert!(registry.resolve_native(BackendKind::Gcs).is_ok());
        assert!(registry.resolve_native(BackendKind::Aws).is_err());
    }

    #[tokio::test]
    async fn test_shutdown_reaches_every_adapter() {
        let backends: Vec<Arc<MemoryBackend>> = BackendKind::ALL
            .iter()
            .map(|k| Arc::new(MemoryBackend::new(*k)))
            .collect();
        let adapters = backends
            .iter()
            .map(|b| Arc::clone(b) as Arc<dyn StorageBackend>)
            .collect();
        let registry = BackendRegistry::from_adapters(adapters, Some(BackendKind::Aws)).unwrap();

        registry.shutdown().await.unwrap();
        assert!(backends.iter().all(|b| b.is_shut_down()));
    }
}
