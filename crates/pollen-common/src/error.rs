//! Error types for Pollen
//!
//! This module defines the error taxonomy shared by the codec, the adapters,
//! the orchestrator and the command layer.

use crate::types::{BackendKind, CopySourceError};
use std::fmt;
use thiserror::Error;

/// Common result type for Pollen operations
pub type Result<T> = std::result::Result<T, Error>;

/// One backend's failure inside a fan-out or fan-in
#[derive(Debug)]
pub struct BackendFailure {
    pub backend: BackendKind,
    pub error: Box<Error>,
}

impl BackendFailure {
    pub fn new(backend: BackendKind, error: Error) -> Self {
        Self {
            backend,
            error: Box::new(error),
        }
    }
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.error)
    }
}

/// Common error type for Pollen
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid credentials, or a required backend is absent.
    /// Fatal at construction time, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// One adapter's underlying provider call failed
    #[error("{backend} backend error{}: {message}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Backend {
        backend: BackendKind,
        status: Option<u16>,
        message: String,
    },

    /// A share set could not be turned back into the payload
    #[error("reconstruction failed: {0}")]
    Reconstruction(String),

    #[error("insufficient shares for reconstruction: have {available}, need {required}{}", render_failures(failures))]
    InsufficientShares {
        available: usize,
        required: usize,
        failures: Vec<BackendFailure>,
    },

    /// A mirrored operation did not succeed everywhere. `succeeded` may be
    /// empty when every backend failed; when it is not, backends diverge.
    #[error("{operation} failed on {} of {} backends{}", failures.len(), failures.len() + succeeded.len(), render_failures(failures))]
    PartialFanOut {
        operation: &'static str,
        succeeded: Vec<BackendKind>,
        failures: Vec<BackendFailure>,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn render_failures(failures: &[BackendFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = failures.iter().map(ToString::to_string).collect();
    format!(" [{}]", parts.join("; "))
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a backend error
    pub fn backend(backend: BackendKind, status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::Backend {
            backend,
            status,
            message: msg.into(),
        }
    }

    /// Create a reconstruction error
    pub fn reconstruction(msg: impl Into<String>) -> Self {
        Self::Reconstruction(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an unsupported operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Backend that produced this error, if any
    #[must_use]
    pub const fn backend_kind(&self) -> Option<BackendKind> {
        match self {
            Self::Backend { backend, .. } => Some(*backend),
            _ => None,
        }
    }

    /// Provider status code, if the error came from an HTTP response
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => *status,
            _ => None,
        }
    }

    /// Check if this is a retryable error
    ///
    /// Transport failures and timeouts carry no status; throttling and
    /// server-side errors are retryable as well.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Backend { status: None, .. } => true,
            Self::Backend {
                status: Some(code), ..
            } => *code == 429 || *code >= 500,
            _ => false,
        }
    }

    /// Check if this is a not found error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Backend {
                status: Some(404),
                ..
            }
        )
    }

    /// Backends that failed, for fan-out and fan-in errors
    #[must_use]
    pub fn failed_backends(&self) -> Vec<BackendKind> {
        match self {
            Self::PartialFanOut { failures, .. } | Self::InsufficientShares { failures, .. } => {
                failures.iter().map(|f| f.backend).collect()
            }
            Self::Backend { backend, .. } => vec![*backend],
            _ => Vec::new(),
        }
    }
}

impl From<CopySourceError> for Error {
    fn from(e: CopySourceError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}
