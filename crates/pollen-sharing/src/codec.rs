//! Share codec
//!
//! `ShareCodec` is the high-level API: it frames the payload, splits it into
//! positional [`Share`]s and reverses the process.
//!
//! ```
//! use pollen_sharing::ShareCodec;
//! use pollen_common::SharingConfig;
//!
//! let codec = ShareCodec::new(SharingConfig::new(3, 2)).unwrap();
//! let shares = codec.split(b"hello world").unwrap();
//! let payload = codec.combine(&shares[1..]).unwrap();
//! assert_eq!(payload, b"hello world");
//! ```

use crate::backend::{ShamirBackend, SharingBackend};
use crate::share::{Share, WriteId};
use bytes::Bytes;
use pollen_common::{Error as CommonError, Result, SharingConfig};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

/// Frame version byte prefixed to every payload before splitting
const FRAME_V2: u8 = 0x02;

/// Bytes of `SHA-256(write id || payload)` kept in the frame
const DIGEST_LEN: usize = 16;

/// Errors specific to share coding
#[derive(Debug, Error)]
pub enum SharingError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("split failed: {0}")]
    SplitFailed(String),

    #[error("combine failed: {0}")]
    CombineFailed(String),

    #[error("insufficient shares: have {available}, need {required}")]
    InsufficientShares { available: usize, required: usize },

    #[error("malformed share: {0}")]
    MalformedShare(String),

    /// A share was read from a position, or under a layout, it was not written for
    #[error("share layout mismatch at position {position}: {reason}")]
    LayoutMismatch { position: usize, reason: String },

    /// Shares from different splits cannot be combined
    #[error("shares come from different writes ({first} and {second})")]
    MixedWrites { first: WriteId, second: WriteId },

    #[error("integrity check failed: {0}")]
    IntegrityCheckFailed(String),
}

impl From<SharingError> for CommonError {
    fn from(e: SharingError) -> Self {
        match e {
            SharingError::InvalidConfig(msg) => CommonError::InvalidArgument(msg),
            SharingError::InsufficientShares {
                available,
                required,
            } => CommonError::InsufficientShares {
                available,
                required,
                failures: Vec::new(),
            },
            other => CommonError::Reconstruction(other.to_string()),
        }
    }
}

fn frame_digest(write_id: WriteId, payload: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(write_id.as_bytes());
    hasher.update(payload);
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&hasher.finalize()[..DIGEST_LEN]);
    digest
}

/// Threshold sharing codec
pub struct ShareCodec {
    config: SharingConfig,
    backend: Arc<dyn SharingBackend>,
}

impl ShareCodec {
    /// Create a codec using the default Shamir backend
    pub fn new(config: SharingConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(ShamirBackend::new()))
    }

    /// Create a codec over an explicit sharing backend
    pub fn with_backend(config: SharingConfig, backend: Arc<dyn SharingBackend>) -> Result<Self> {
        config.validate().map_err(SharingError::InvalidConfig)?;
        let max = backend.capabilities().max_shares;
        if usize::from(config.shares) > max {
            return Err(SharingError::InvalidConfig(format!(
                "{} shares exceeds backend maximum of {max}",
                config.shares
            ))
            .into());
        }
        Ok(Self { config, backend })
    }

    /// Get the configuration
    #[must_use]
    pub const fn config(&self) -> SharingConfig {
        self.config
    }

    /// Total shares per payload (n)
    #[must_use]
    pub fn shares(&self) -> usize {
        usize::from(self.config.shares)
    }

    /// Shares needed to reconstruct (k)
    #[must_use]
    pub fn threshold(&self) -> usize {
        usize::from(self.config.threshold)
    }

    /// Split a payload into `n` positional shares
    ///
    /// Share `i` must be stored on backend `i`. All shares carry a fresh
    /// write id; the framed secret carries a digest binding the payload to it.
    pub fn split(&self, payload: &[u8]) -> Result<Vec<Share>> {
        let write_id = WriteId::random();
        let mut framed = Vec::with_capacity(payload.len() + 1 + DIGEST_LEN);
        framed.push(FRAME_V2);
        framed.extend_from_slice(&frame_digest(write_id, payload));
        framed.extend_from_slice(payload);

        let raw = self
            .backend
            .split(&framed, self.config.shares, self.config.threshold)?;

        Ok(raw
            .into_iter()
            .zip(0u8..)
            .map(|(data, index)| Share::new(index, self.config, write_id, Bytes::from(data)))
            .collect())
    }

    /// Parse a stored share body read from `position`
    ///
    /// Rejects bodies written for another position or another layout, which
    /// is what happens when the backend set or its order changed between the
    /// write and the read.
    pub fn decode_share(&self, position: usize, body: &[u8]) -> Result<Share> {
        let share = Share::decode(body)?;
        if usize::from(share.index) != position {
            return Err(SharingError::LayoutMismatch {
                position,
                reason: format!("share was written for position {}", share.index),
            }
            .into());
        }
        if share.layout != self.config {
            return Err(SharingError::LayoutMismatch {
                position,
                reason: format!(
                    "share was written as {}, expected {}",
                    share.layout, self.config
                ),
            }
            .into());
        }
        Ok(share)
    }

    /// Reconstruct the payload from `k` or more shares
    ///
    /// Shares must carry distinct indices, this codec's layout and one write
    /// id. The result does not depend on which valid subset is supplied, and
    /// a reconstruction that does not match its digest is an error.
    pub fn combine(&self, shares: &[Share]) -> Result<Vec<u8>> {
        let mut seen = BTreeSet::new();
        for share in shares {
            if share.write_id != shares[0].write_id {
                return Err(SharingError::MixedWrites {
                    first: shares[0].write_id,
                    second: share.write_id,
                }
                .into());
            }
            if share.layout != self.config {
                return Err(SharingError::LayoutMismatch {
                    position: usize::from(share.index),
                    reason: format!("share layout {} differs from {}", share.layout, self.config),
                }
                .into());
            }
            if !seen.insert(share.index) {
                return Err(SharingError::MalformedShare(format!(
                    "duplicate share index {}",
                    share.index
                ))
                .into());
            }
        }

        if shares.len() < self.threshold() {
            return Err(SharingError::InsufficientShares {
                available: shares.len(),
                required: self.threshold(),
            }
            .into());
        }

        let raw: Vec<&[u8]> = shares.iter().map(|s| s.data.as_ref()).collect();
        let framed = self.backend.combine(&raw, self.config.threshold)?;

        let (digest, payload) = match framed.split_first() {
            Some((&FRAME_V2, rest)) if rest.len() >= DIGEST_LEN => rest.split_at(DIGEST_LEN),
            Some((&FRAME_V2, _)) => {
                return Err(SharingError::IntegrityCheckFailed("truncated frame".into()).into());
            }
            Some((&other, _)) => {
                return Err(SharingError::CombineFailed(format!(
                    "unknown frame version {other:#04x}"
                ))
                .into());
            }
            None => return Err(SharingError::CombineFailed("empty reconstruction".into()).into()),
        };
        if digest != frame_digest(shares[0].write_id, payload) {
            return Err(SharingError::IntegrityCheckFailed(format!(
                "digest mismatch for write {}",
                shares[0].write_id
            ))
            .into());
        }
        Ok(payload.to_vec())
    }
}

impl Default for ShareCodec {
    fn default() -> Self {
        Self {
            config: SharingConfig::DEFAULT,
            backend: Arc::new(ShamirBackend::new()),
        }
    }
}
