//! Bucket lifecycle commands, mirrored on every backend

use crate::command::{Command, Dispatch};
use crate::orchestrator::{ListReport, Orchestrator};
use async_trait::async_trait;
use pollen_common::Result;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateBucketInput {
    pub bucket: String,
}

/// Create the same bucket on every backend
#[derive(Clone, Debug)]
pub struct CreateBucketCommand {
    pub input: CreateBucketInput,
}

impl CreateBucketCommand {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            input: CreateBucketInput {
                bucket: bucket.into(),
            },
        }
    }
}

#[async_trait]
impl Command for CreateBucketCommand {
    type Output = ();

    fn name(&self) -> &'static str {
        "CreateBucket"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::FanOut
    }

    async fn resolve(&self, orchestrator: &Orchestrator) -> Result<()> {
        orchestrator.create_bucket(&self.input.bucket).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteBucketInput {
    pub bucket: String,
}

/// Empty and delete the bucket on every backend
#[derive(Clone, Debug)]
pub struct DeleteBucketCommand {
    pub input: DeleteBucketInput,
}

impl DeleteBucketCommand {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            input: DeleteBucketInput {
                bucket: bucket.into(),
            },
        }
    }
}

#[async_trait]
impl Command for DeleteBucketCommand {
    type Output = ();

    fn name(&self) -> &'static str {
        "DeleteBucket"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::FanOut
    }

    async fn resolve(&self, orchestrator: &Orchestrator) -> Result<()> {
        orchestrator.delete_bucket(&self.input.bucket).await
    }
}

pub type ListBucketsOutput = ListReport;

/// Per-backend bucket listing
#[derive(Clone, Debug, Default)]
pub struct ListBucketsCommand;

#[async_trait]
impl Command for ListBucketsCommand {
    type Output = ListBucketsOutput;

    fn name(&self) -> &'static str {
        "ListBuckets"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::FanOut
    }

    async fn resolve(&self, orchestrator: &Orchestrator) -> Result<ListBucketsOutput> {
        Ok(orchestrator.list_buckets().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{Cluster, fast_options};

    #[tokio::test]
    async fn test_bucket_commands() {
        let cluster = Cluster::new();
        let orchestrator = cluster.orchestrator(fast_options());

        let create = CreateBucketCommand::new("logs");
        assert_eq!(create.dispatch(), Dispatch::FanOut);
        create.resolve(&orchestrator).await.unwrap();

        let report = ListBucketsCommand.resolve(&orchestrator).await.unwrap();
        assert_eq!(report.listings.len(), 3);
        assert!(report.listings.iter().all(|l| l.names == ["logs"]));

        DeleteBucketCommand::new("logs")
            .resolve(&orchestrator)
            .await
            .unwrap();
        assert!(cluster.backends.iter().all(|b| !b.has_bucket("logs")));
    }
}
