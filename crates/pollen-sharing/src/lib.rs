//! Pollen Sharing - Threshold secret sharing codec
//!
//! This crate turns one payload into `n` shares, any `k` of which reconstruct
//! it, and fewer than `k` of which reveal nothing about it.
//!
//! # Backends
//!
//! - **shamir** (default): Shamir's scheme over GF(256) using `sharks`
//!
//! # Stored form
//!
//! Shares are stored as positional text
//! (`pss2:<index>:<n>:<k>:<write id>:<hex>`), so any binary payload
//! round-trips exactly. A share read from the wrong position, or combined
//! with shares of another write, is rejected instead of silently producing
//! garbage; the reconstructed frame carries a digest checked on every combine.
//!
//! # Example
//!
//! ```
//! use pollen_sharing::ShareCodec;
//! use pollen_common::SharingConfig;
//!
//! let codec = ShareCodec::new(SharingConfig::DEFAULT).unwrap();
//! let bodies: Vec<_> = codec.split(&[0xff, 0x00, 0x7f]).unwrap().iter().map(|s| s.to_body()).collect();
//!
//! // Lose share 0, rebuild from the other two
//! let shares = vec![
//!     codec.decode_share(1, &bodies[1]).unwrap(),
//!     codec.decode_share(2, &bodies[2]).unwrap(),
//! ];
//! assert_eq!(codec.combine(&shares).unwrap(), vec![0xff, 0x00, 0x7f]);
//! ```

pub mod backend;
pub mod codec;
pub mod share;

pub use backend::{BackendCapabilities, ShamirBackend, SharingBackend};
pub use codec::{ShareCodec, SharingError};
pub use share::{Share, WriteId};
