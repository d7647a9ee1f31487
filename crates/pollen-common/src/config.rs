//! Configuration types for Pollen
//!
//! A [`PollenConfig`] is built once per client session, validated, and then
//! passed by reference into the registry and the client. Nothing mutates it
//! afterwards.

use crate::error::{Error, Result};
use crate::types::BackendKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Root configuration for a Pollen client session
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PollenConfig {
    /// Backends to activate, in fan-out order. Share `i` lives on backend `i`.
    pub backends: Vec<BackendKind>,
    /// Distinguished backend for native passthrough calls (`None` = not required)
    pub native_backend: Option<BackendKind>,
    /// Reconstruction threshold (k); the share count is the number of backends
    pub threshold: u8,
    /// Per-backend request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Retry policy for share reads
    pub read_retry: RetryConfig,
    /// What to do with written shares when a Put fails on some backends
    pub partial_put: PartialPutPolicy,
    /// Amazon S3 settings
    pub aws: Option<AwsConfig>,
    /// Azure Blob Storage settings
    pub azure: Option<AzureConfig>,
    /// Google Cloud Storage settings
    pub gcs: Option<GcsConfig>,
}

impl Default for PollenConfig {
    fn default() -> Self {
        Self {
            backends: BackendKind::ALL.to_vec(),
            native_backend: Some(BackendKind::Aws),
            threshold: 2,
            request_timeout_ms: 30_000,
            read_retry: RetryConfig::default(),
            partial_put: PartialPutPolicy::default(),
            aws: None,
            azure: None,
            gcs: None,
        }
    }
}

impl PollenConfig {
    /// Replace the backend list, keeping everything else
    #[must_use]
    pub fn with_backends(mut self, backends: Vec<BackendKind>) -> Self {
        self.backends = backends;
        self
    }

    /// Set the reconstruction threshold
    #[must_use]
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Per-backend request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate the configuration without touching the network
    pub fn validate(&self) -> Result<()> {
        if self.backends.is_empty() {
            return Err(Error::configuration("at least one backend must be configured"));
        }

        let mut seen = HashSet::new();
        for kind in &self.backends {
            if !seen.insert(*kind) {
                return Err(Error::configuration(format!(
                    "backend '{kind}' is listed more than once"
                )));
            }
        }

        if let Some(native) = self.native_backend {
            if !self.backends.contains(&native) {
                return Err(Error::configuration(format!(
                    "{native} must be included in the backend list but got [{}]",
                    self.backends
                        .iter()
                        .map(BackendKind::name)
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }

        if self.backends.len() > usize::from(u8::MAX) {
            return Err(Error::configuration("too many backends (max 255)"));
        }
        if self.threshold == 0 {
            return Err(Error::configuration("threshold must be > 0"));
        }
        if usize::from(self.threshold) > self.backends.len() {
            return Err(Error::configuration(format!(
                "threshold {} exceeds the number of backends ({})",
                self.threshold,
                self.backends.len()
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::configuration("request_timeout_ms must be > 0"));
        }
        if self.read_retry.attempts == 0 {
            return Err(Error::configuration("read_retry.attempts must be >= 1"));
        }
        Ok(())
    }
}

/// Fixed-delay retry policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Delay between attempts in milliseconds
    pub delay_ms: u64,
}

impl RetryConfig {
    /// Single attempt, no retry
    pub const NONE: Self = Self {
        attempts: 1,
        delay_ms: 0,
    };

    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 200,
        }
    }
}

/// Handling of shares already written when a Put fails elsewhere
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialPutPolicy {
    /// Leave written shares in place and report the failure (requires repair)
    #[default]
    Keep,
    /// Best-effort delete of the shares that were written
    Rollback,
}

/// Amazon S3 credentials and endpoint
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// Region used for signing and bucket placement (default: us-east-2)
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack, ...)
    pub endpoint: Option<String>,
    /// Use path-style addressing instead of virtual-hosted buckets
    pub path_style: bool,
}

impl AwsConfig {
    pub const DEFAULT_REGION: &'static str = "us-east-2";

    /// Region, falling back to the default
    #[must_use]
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(Self::DEFAULT_REGION)
    }
}

/// Azure Blob Storage credentials
///
/// Either a connection string, or an account name plus account key.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    pub connection_string: Option<String>,
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    /// Blob service endpoint override (default: https://<account>.blob.core.windows.net)
    pub endpoint: Option<String>,
}

/// Google Cloud Storage project and credentials
///
/// Without a credentials file, Application Default Credentials are used.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GcsConfig {
    pub project_id: Option<String>,
    /// Service account or authorized user JSON key file
    pub credentials_file: Option<String>,
    /// Endpoint override, e.g. a local emulator (default: https://storage.googleapis.com)
    pub endpoint: Option<String>,
}
