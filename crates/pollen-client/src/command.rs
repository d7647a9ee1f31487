//! Command dispatch
//!
//! A command is a typed input plus a `resolve` entry point. Fan-out commands
//! resolve through the orchestrator; passthrough commands go straight to the
//! native client of the distinguished backend.

use crate::orchestrator::Orchestrator;
use async_trait::async_trait;
use pollen_common::Result;
use std::fmt;

/// How a command reaches the backends
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Issued to every backend, shared or mirrored
    FanOut,
    /// Issued to the distinguished backend only, unshared
    Passthrough,
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FanOut => write!(f, "fan-out"),
            Self::Passthrough => write!(f, "passthrough"),
        }
    }
}

/// One client operation
#[async_trait]
pub trait Command: Send + Sync {
    type Output: Send;

    /// Operation name, used in logs
    fn name(&self) -> &'static str;

    fn dispatch(&self) -> Dispatch;

    async fn resolve(&self, orchestrator: &Orchestrator) -> Result<Self::Output>;
}
