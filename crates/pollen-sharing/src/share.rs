//! Share type and its stored text encoding
//!
//! A stored share is ASCII text:
//!
//! ```text
//! pss2:<index>:<shares>:<threshold>:<write id>:<hex of share bytes>
//! ```
//!
//! The header lets a reader detect that a share was written for a different
//! position, a different sharing layout or a different write before any
//! reconstruction runs.

use crate::SharingError;
use bytes::Bytes;
use pollen_common::SharingConfig;
use std::fmt;

const PREFIX: &str = "pss2";

/// Identifier shared by all shares produced by one split
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WriteId(pub [u8; 16]);

impl WriteId {
    /// Fresh random identifier
    #[must_use]
    pub fn random() -> Self {
        let mut id = [0u8; 16];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut id);
        Self(id)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    fn parse(text: &str) -> Result<Self, SharingError> {
        let mut id = [0u8; 16];
        hex::decode_to_slice(text, &mut id)
            .map_err(|e| SharingError::MalformedShare(format!("invalid write id: {e}")))?;
        Ok(Self(id))
    }
}

impl fmt::Display for WriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// One share of a secret-shared payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share {
    /// Zero-based position among the `shares` produced by one split
    pub index: u8,
    /// Layout this share was produced under
    pub layout: SharingConfig,
    /// Split this share came from
    pub write_id: WriteId,
    /// Raw share bytes; byte 0 is the evaluation point `index + 1`
    pub data: Bytes,
}

impl Share {
    /// Create a new share
    #[must_use]
    pub const fn new(index: u8, layout: SharingConfig, write_id: WriteId, data: Bytes) -> Self {
        Self {
            index,
            layout,
            write_id,
            data,
        }
    }

    /// Get the size of the raw share data
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Encode as the stored text form
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{PREFIX}:{}:{}:{}:{}:{}",
            self.index,
            self.layout.shares,
            self.layout.threshold,
            self.write_id,
            hex::encode(&self.data)
        )
    }

    /// Encode as a body ready to hand to a storage backend
    #[must_use]
    pub fn to_body(&self) -> Bytes {
        Bytes::from(self.encode())
    }

    /// Parse the stored text form
    ///
    /// Checks the header is self-consistent; it does not check the share
    /// against any expected position (see `ShareCodec::decode_share`).
    pub fn decode(body: &[u8]) -> Result<Self, SharingError> {
        let text = std::str::from_utf8(body)
            .map_err(|_| SharingError::MalformedShare("share body is not ASCII text".into()))?;

        let mut parts = text.trim_end().splitn(6, ':');
        if parts.next() != Some(PREFIX) {
            return Err(SharingError::MalformedShare(format!(
                "missing '{PREFIX}' prefix"
            )));
        }
        let index = parse_field(parts.next(), "index")?;
        let shares = parse_field(parts.next(), "shares")?;
        let threshold = parse_field(parts.next(), "threshold")?;
        let write_id = WriteId::parse(
            parts
                .next()
                .ok_or_else(|| SharingError::MalformedShare("missing write id".into()))?,
        )?;
        let payload = parts
            .next()
            .ok_or_else(|| SharingError::MalformedShare("missing share data".into()))?;

        let layout = SharingConfig::new(shares, threshold);
        layout.validate().map_err(SharingError::MalformedShare)?;
        if index >= shares {
            return Err(SharingError::MalformedShare(format!(
                "index {index} out of range for {layout}"
            )));
        }

        let data = hex::decode(payload)
            .map_err(|e| SharingError::MalformedShare(format!("invalid hex: {e}")))?;
        match data.first() {
            Some(&x) if u16::from(x) == u16::from(index) + 1 => {}
            Some(&x) => {
                return Err(SharingError::MalformedShare(format!(
                    "evaluation point {x} does not match index {index}"
                )));
            }
            None => return Err(SharingError::MalformedShare("empty share data".into())),
        }
        if data.len() < 2 {
            return Err(SharingError::MalformedShare("share data too short".into()));
        }

        Ok(Self::new(index, layout, write_id, Bytes::from(data)))
    }
}

fn parse_field(field: Option<&str>, name: &str) -> Result<u8, SharingError> {
    field
        .ok_or_else(|| SharingError::MalformedShare(format!("missing {name}")))?
        .parse()
        .map_err(|_| SharingError::MalformedShare(format!("invalid {name}")))
}
