//! Pollen Common - Shared types and utilities
//!
//! This crate provides the backend identities, configuration structures and
//! the error taxonomy used across all Pollen components.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AwsConfig, AzureConfig, GcsConfig, PartialPutPolicy, PollenConfig, RetryConfig,
};
pub use error::{BackendFailure, Error, Result};
pub use types::*;
