//! Pollen Client - Threshold-shared object storage across clouds
//!
//! This crate provides:
//! - `Orchestrator`: fan-out writes and threshold fan-in reads over the
//!   registered backends
//! - `Command`: the dispatch contract, with fan-out and passthrough commands
//! - `PollenClient`: the single client type callers use

pub mod client;
pub mod command;
pub mod commands;
pub mod orchestrator;

#[cfg(test)]
mod test_util;

pub use client::PollenClient;
pub use command::{Command, Dispatch};
pub use orchestrator::{BackendListing, ClientOptions, ListReport, ListSubject, Orchestrator};
