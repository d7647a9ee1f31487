//! Native client escape hatch
//!
//! Administrative operations that only make sense on one provider (bucket
//! policy, ACLs, lifecycle rules, ...) bypass the uniform capability set and
//! talk to the adapter's own client.

use crate::memory::MemoryBackend;
use crate::s3::S3Client;
use azure_storage_blobs::prelude::BlobServiceClient;
use bytes::Bytes;
use google_cloud_storage::client::StorageControl;
use pollen_common::{BackendKind, Error, Result};
use std::fmt;
use std::str::FromStr;

/// Borrowed native client of one adapter
#[derive(Clone, Copy)]
pub enum NativeClient<'a> {
    S3(&'a S3Client),
    Azure(&'a BlobServiceClient),
    Gcs(&'a StorageControl),
    Memory(&'a MemoryBackend),
}

impl NativeClient<'_> {
    /// Provider-level name of the client, for diagnostics
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::S3(_) => "s3",
            Self::Azure(_) => "azure-blob",
            Self::Gcs(_) => "gcs-control",
            Self::Memory(_) => "memory",
        }
    }

    /// Issue a bucket or object subresource request (S3 semantics)
    pub async fn subresource_request(
        &self,
        method: NativeMethod,
        bucket: &str,
        key: Option<&str>,
        subresource: Option<Subresource>,
        body: Option<Bytes>,
    ) -> Result<NativeResponse> {
        match self {
            Self::S3(client) => {
                client
                    .subresource_request(method, bucket, key, subresource, body)
                    .await
            }
            Self::Memory(memory) => {
                memory
                    .subresource_request(method, bucket, key, subresource, body)
                    .await
            }
            Self::Azure(_) | Self::Gcs(_) => Err(Error::unsupported(format!(
                "{} native client does not serve S3 subresource requests",
                self.name()
            ))),
        }
    }
}

impl fmt::Debug for NativeClient<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativeClient").field(&self.name()).finish()
    }
}

/// HTTP method of a native request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NativeMethod {
    Get,
    Put,
    Delete,
    Head,
}

impl NativeMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NativeMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "put" => Ok(Self::Put),
            "delete" => Ok(Self::Delete),
            "head" => Ok(Self::Head),
            _ => Err(format!("unknown method: {s}")),
        }
    }
}

macro_rules! subresources {
    ($($variant:ident => $query:literal,)+) => {
        /// Administrative subresource addressed by a native request
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Subresource {
            $($variant,)+
        }

        impl Subresource {
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// Query parameter name selecting this subresource
            #[must_use]
            pub const fn as_query(&self) -> &'static str {
                match self {
                    $(Self::$variant => $query,)+
                }
            }
        }
    };
}

subresources! {
    Acl => "acl",
    Policy => "policy",
    PolicyStatus => "policyStatus",
    Cors => "cors",
    Lifecycle => "lifecycle",
    Encryption => "encryption",
    Website => "website",
    Versioning => "versioning",
    Accelerate => "accelerate",
    OwnershipControls => "ownershipControls",
    RequestPayment => "requestPayment",
    Replication => "replication",
    Inventory => "inventory",
    Metrics => "metrics",
    ObjectLock => "object-lock",
    Tagging => "tagging",
    LegalHold => "legal-hold",
    Retention => "retention",
    Torrent => "torrent",
    Location => "location",
    Logging => "logging",
    Notification => "notification",
    PublicAccessBlock => "publicAccessBlock",
}

impl fmt::Display for Subresource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for Subresource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|sub| sub.as_query().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown subresource: {s}"))
    }
}

/// Raw response of a native request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeResponse {
    pub backend: BackendKind,
    pub status: u16,
    pub body: Bytes,
}

impl NativeResponse {
    /// Body as text, lossy for non-UTF-8 bytes
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subresource_parse() {
        assert_eq!("acl".parse::<Subresource>().unwrap(), Subresource::Acl);
        assert_eq!("policyStatus".parse::<Subresource>().unwrap(), Subresource::PolicyStatus);
        assert_eq!("OBJECT-LOCK".parse::<Subresource>().unwrap(), Subresource::ObjectLock);
        assert!("uploads".parse::<Subresource>().is_err());
        for sub in Subresource::ALL {
            assert_eq!(sub.to_string().parse::<Subresource>().unwrap(), *sub);
        }
    }

    #[test]
    fn test_native_method_parse() {
        assert_eq!("GET".parse::<NativeMethod>().unwrap(), NativeMethod::Get);
        assert_eq!("head".parse::<NativeMethod>().unwrap(), NativeMethod::Head);
        assert!("post".parse::<NativeMethod>().is_err());
    }
}
