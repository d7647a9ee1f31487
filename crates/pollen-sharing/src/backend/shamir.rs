//! Shamir secret sharing backend using `sharks`
//!
//! Each byte of the secret is the constant term of an independent random
//! polynomial of degree `threshold - 1` over GF(256). Share `i` holds the
//! evaluations of every polynomial at `x = i + 1`.

use super::{BackendCapabilities, BackendResult, SharingBackend};
use crate::SharingError;
use sharks::{Share, Sharks};

/// Shamir backend over GF(256)
#[derive(Clone, Copy, Debug, Default)]
pub struct ShamirBackend;

impl ShamirBackend {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SharingBackend for ShamirBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: "shamir_gf256",
            max_shares: 255,
            information_theoretic: true,
        }
    }

    fn split(
        &self,
        secret: &[u8],
        share_count: u8,
        threshold: u8,
    ) -> BackendResult<Vec<Vec<u8>>> {
        if threshold == 0 || threshold > share_count {
            return Err(SharingError::InvalidConfig(format!(
                "threshold {threshold} must be within 1..={share_count}"
            )));
        }
        // sharks cannot represent a share with an empty y vector
        if secret.is_empty() {
            return Err(SharingError::SplitFailed("secret is empty".into()));
        }

        let shares: Vec<Vec<u8>> = Sharks(threshold)
            .dealer(secret)
            .take(usize::from(share_count))
            .map(|share| Vec::from(&share))
            .collect();

        if shares.len() != usize::from(share_count) {
            return Err(SharingError::SplitFailed(format!(
                "dealer produced {} of {share_count} shares",
                shares.len()
            )));
        }
        Ok(shares)
    }

    fn combine(&self, shares: &[&[u8]], threshold: u8) -> BackendResult<Vec<u8>> {
        if shares.len() < usize::from(threshold) {
            return Err(SharingError::InsufficientShares {
                available: shares.len(),
                required: usize::from(threshold),
            });
        }

        let parsed = shares
            .iter()
            .map(|bytes| {
                Share::try_from(*bytes).map_err(|e| SharingError::MalformedShare(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Sharks(threshold)
            .recover(&parsed)
            .map_err(|e| SharingError::CombineFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_assigns_evaluation_points() {
        let backend = ShamirBackend::new();
        let shares = backend.split(b"secret", 3, 2).unwrap();
        assert_eq!(shares.len(), 3);
        for (i, share) in shares.iter().enumerate() {
            assert_eq!(usize::from(share[0]), i + 1);
            assert_eq!(share.len(), 1 + 6);
        }
    }

    #[test]
    fn test_combine_any_pair() {
        let backend = ShamirBackend::new();
        let shares = backend.split(b"any two of three", 3, 2).unwrap();

        for (a, b) in [(0, 1), (0, 2), (1, 2)] {
            let subset = [shares[a].as_slice(), shares[b].as_slice()];
            assert_eq!(backend.combine(&subset, 2).unwrap(), b"any two of three");
        }
    }

    #[test]
    fn test_combine_below_threshold() {
        let backend = ShamirBackend::new();
        let shares = backend.split(b"secret", 5, 3).unwrap();
        let subset = [shares[0].as_slice(), shares[4].as_slice()];
        assert!(matches!(
            backend.combine(&subset, 3),
            Err(SharingError::InsufficientShares {
                available: 2,
                required: 3
            })
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        let backend = ShamirBackend::new();
        assert!(backend.split(b"x", 2, 3).is_err());
        assert!(backend.split(b"x", 2, 0).is_err());
        assert!(backend.split(b"", 3, 2).is_err());
        assert!(backend.combine(&[&[1u8][..], &[2u8][..]], 2).is_err());
    }
}
