//! Core type definitions for Pollen
//!
//! This module defines the backend identities, the sharing parameters and
//! the small value types that flow between the client, the orchestrator and
//! the backend adapters.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one cloud storage backend
///
/// The set is closed: adding a provider means adding a variant here, and the
/// compiler then points at every dispatch site that must learn about it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Amazon S3 (or any S3-compatible endpoint)
    Aws,
    /// Azure Blob Storage
    Azure,
    /// Google Cloud Storage
    Gcs,
}

impl BackendKind {
    /// Every backend, in the default fan-out order
    pub const ALL: [Self; 3] = [Self::Aws, Self::Azure, Self::Gcs];

    /// Get the backend name as used in configuration and on the command line
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Gcs => "gcs",
        }
    }

    /// Human readable provider name, used in reports
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Aws => "AWS",
            Self::Azure => "Azure",
            Self::Gcs => "GCS",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aws" | "s3" => Ok(Self::Aws),
            "azure" | "blob" => Ok(Self::Azure),
            "gcs" | "gcp" | "google" => Ok(Self::Gcs),
            _ => Err(format!("unknown backend: {s}")),
        }
    }
}

/// Threshold sharing parameters: `shares` (n) total, any `threshold` (k) reconstruct
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{threshold}-of-{shares}")]
pub struct SharingConfig {
    /// Total number of shares produced per payload (n)
    pub shares: u8,
    /// Minimum number of shares needed for reconstruction (k)
    pub threshold: u8,
}

impl SharingConfig {
    /// System default: three shares, any two reconstruct
    pub const DEFAULT: Self = Self::new(3, 2);

    /// Create a new sharing configuration
    #[must_use]
    pub const fn new(shares: u8, threshold: u8) -> Self {
        Self { shares, threshold }
    }

    /// Number of shares that may be lost while still reconstructing
    #[must_use]
    pub const fn loss_tolerance(&self) -> u8 {
        self.shares.saturating_sub(self.threshold)
    }

    /// Check that `1 <= threshold <= shares`
    pub fn validate(&self) -> Result<(), String> {
        if self.threshold == 0 {
            return Err("threshold must be > 0".into());
        }
        if self.threshold > self.shares {
            return Err(format!(
                "threshold {} exceeds share count {}",
                self.threshold, self.shares
            ));
        }
        Ok(())
    }
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A `(bucket, key)` pair
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{bucket}/{key}")]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// Source of a single-backend copy, written as `sourceBucket/sourceKey`
#[derive(Clone, Debug, PartialEq, Eq, Display)]
#[display("{_0}")]
pub struct CopySource(ObjectLocation);

impl CopySource {
    /// Parse a copy source reference
    ///
    /// The first `/` separates bucket from key; a leading `/` is tolerated
    /// (S3 style). Both parts must be non-empty.
    pub fn parse(source: &str) -> Result<Self, CopySourceError> {
        let trimmed = source.strip_prefix('/').unwrap_or(source);
        let (bucket, key) = trimmed
            .split_once('/')
            .ok_or_else(|| CopySourceError::MissingSeparator(source.to_string()))?;
        if bucket.is_empty() {
            return Err(CopySourceError::EmptyBucket);
        }
        if key.is_empty() {
            return Err(CopySourceError::EmptyKey);
        }
        Ok(Self(ObjectLocation::new(bucket, key)))
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.0.bucket
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.0.key
    }

    #[must_use]
    pub fn into_location(self) -> ObjectLocation {
        self.0
    }
}

/// Copy source parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CopySourceError {
    #[error("copy source must be 'bucket/key', got '{0}'")]
    MissingSeparator(String),

    #[error("copy source bucket is empty")]
    EmptyBucket,

    #[error("copy source key is empty")]
    EmptyKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("aws".parse::<BackendKind>().unwrap(), BackendKind::Aws);
        assert_eq!("Azure".parse::<BackendKind>().unwrap(), BackendKind::Azure);
        assert_eq!("gcs".parse::<BackendKind>().unwrap(), BackendKind::Gcs);
        assert!("dropbox".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_backend_kind_serde() {
        let json = serde_json::to_string(&BackendKind::ALL).unwrap();
        assert_eq!(json, r#"["aws","azure","gcs"]"#);
        let back: Vec<BackendKind> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BackendKind::ALL);
    }

    #[test]
    fn test_sharing_config() {
        let config = SharingConfig::default();
        assert_eq!(config.shares, 3);
        assert_eq!(config.threshold, 2);
        assert_eq!(config.loss_tolerance(), 1);
        assert_eq!(config.to_string(), "2-of-3");
        assert!(config.validate().is_ok());

        assert!(SharingConfig::new(3, 0).validate().is_err());
        assert!(SharingConfig::new(2, 3).validate().is_err());
    }

    #[test]
    fn test_copy_source_parse() {
        let source = CopySource::parse("photos/2024/cat.png").unwrap();
        assert_eq!(source.bucket(), "photos");
        assert_eq!(source.key(), "2024/cat.png");
        assert_eq!(source.to_string(), "photos/2024/cat.png");

        let leading = CopySource::parse("/photos/cat.png").unwrap();
        assert_eq!(leading.bucket(), "photos");

        assert_eq!(
            CopySource::parse("photos"),
            Err(CopySourceError::MissingSeparator("photos".into()))
        );
        assert_eq!(CopySource::parse("/cat.png"), Err(CopySourceError::MissingSeparator("/cat.png".into())));
        assert_eq!(CopySource::parse("photos/"), Err(CopySourceError::EmptyKey));
    }
}
