//! Secret sharing backend abstraction
//!
//! The codec treats the sharing primitive as a black box with a narrow
//! contract: `split` turns a secret into `share_count` byte strings, any
//! `threshold` of which `combine` turns back into the secret.
//!
//! # Backends
//!
//! - `shamir`: Shamir's scheme over GF(256) via the `sharks` crate (default)

pub mod shamir;

pub use shamir::ShamirBackend;

use crate::SharingError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, SharingError>;

/// Capabilities of a sharing backend
#[derive(Clone, Debug, Default)]
pub struct BackendCapabilities {
    /// Backend name for identification
    pub name: &'static str,
    /// Maximum number of shares per secret
    pub max_shares: usize,
    /// Fewer than `threshold` shares reveal nothing about the secret
    pub information_theoretic: bool,
}

/// Core trait for threshold sharing backends
pub trait SharingBackend: Send + Sync {
    /// Get backend capabilities
    fn capabilities(&self) -> BackendCapabilities;

    /// Split a secret into `share_count` shares
    ///
    /// Share `i` of the returned vector belongs at position `i`. The first
    /// byte of every share is its evaluation point, which is `i + 1`.
    fn split(&self, secret: &[u8], share_count: u8, threshold: u8)
    -> BackendResult<Vec<Vec<u8>>>;

    /// Reconstruct a secret from at least `threshold` shares
    ///
    /// Any valid subset of the shares produced by one `split` call yields the
    /// same secret.
    fn combine(&self, shares: &[&[u8]], threshold: u8) -> BackendResult<Vec<u8>>;
}
