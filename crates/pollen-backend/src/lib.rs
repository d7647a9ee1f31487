//! Pollen Backend - Cloud storage adapters
//!
//! This crate provides:
//! - `StorageBackend`: the uniform bucket/object capability set
//! - Adapters for Amazon S3 (SigV4-signed REST), Azure Blob Storage
//!   (`azure_storage_blobs`) and Google Cloud Storage (`google-cloud-storage`)
//! - `MemoryBackend`: an in-process adapter with fault injection
//! - `BackendRegistry`: the ordered adapter set of one client session
//! - `NativeClient`: escape hatch to an adapter's provider-specific client

pub mod adapter;
pub mod azure;
pub mod gcs;
mod http;
pub mod memory;
pub mod native;
pub mod registry;
pub mod s3;
mod signing;

pub use adapter::StorageBackend;
pub use azure::{AzureBackend, BlobServiceClient};
pub use gcs::GcsBackend;
pub use memory::MemoryBackend;
pub use native::{NativeClient, NativeMethod, NativeResponse, Subresource};
pub use registry::{BackendRegistry, create_adapter};
pub use s3::{S3Backend, S3Client};
