//! Object commands: shared put/get, mirrored delete/list

use crate::command::{Command, Dispatch};
use crate::orchestrator::{ListReport, Orchestrator};
use async_trait::async_trait;
use bytes::Bytes;
use pollen_common::{ObjectLocation, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutObjectInput {
    pub location: ObjectLocation,
    pub body: Bytes,
}

/// Split the body and store one share per backend
#[derive(Clone, Debug)]
pub struct PutObjectCommand {
    pub input: PutObjectInput,
}

impl PutObjectCommand {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            input: PutObjectInput {
                location: ObjectLocation::new(bucket, key),
                body: body.into(),
            },
        }
    }
}

#[async_trait]
impl Command for PutObjectCommand {
    type Output = ();

    fn name(&self) -> &'static str {
        "PutObject"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::FanOut
    }

    async fn resolve(&self, orchestrator: &Orchestrator) -> Result<()> {
        let ObjectLocation { bucket, key } = &self.input.location;
        orchestrator.put_object(bucket, key, &self.input.body).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetObjectInput {
    pub location: ObjectLocation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetObjectOutput {
    pub body: Bytes,
}

/// Gather shares and reconstruct the body
#[derive(Clone, Debug)]
pub struct GetObjectCommand {
    pub input: GetObjectInput,
}

impl GetObjectCommand {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            input: GetObjectInput {
                location: ObjectLocation::new(bucket, key),
            },
        }
    }
}

#[async_trait]
impl Command for GetObjectCommand {
    type Output = GetObjectOutput;

    fn name(&self) -> &'static str {
        "GetObject"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::FanOut
    }

    async fn resolve(&self, orchestrator: &Orchestrator) -> Result<GetObjectOutput> {
        let ObjectLocation { bucket, key } = &self.input.location;
        let body = orchestrator.get_object(bucket, key).await?;
        Ok(GetObjectOutput { body })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteObjectInput {
    pub location: ObjectLocation,
}

/// Drop the object's share on every backend
#[derive(Clone, Debug)]
pub struct DeleteObjectCommand {
    pub input: DeleteObjectInput,
}

impl DeleteObjectCommand {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            input: DeleteObjectInput {
                location: ObjectLocation::new(bucket, key),
            },
        }
    }
}

#[async_trait]
impl Command for DeleteObjectCommand {
    type Output = ();

    fn name(&self) -> &'static str {
        "DeleteObject"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::FanOut
    }

    async fn resolve(&self, orchestrator: &Orchestrator) -> Result<()> {
        let ObjectLocation { bucket, key } = &self.input.location;
        orchestrator.delete_object(bucket, key).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListObjectsInput {
    pub bucket: String,
}

pub type ListObjectsOutput = ListReport;

/// Per-backend key listing
#[derive(Clone, Debug)]
pub struct ListObjectsCommand {
    pub input: ListObjectsInput,
}

impl ListObjectsCommand {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            input: ListObjectsInput {
                bucket: bucket.into(),
            },
        }
    }
}

#[async_trait]
impl Command for ListObjectsCommand {
    type Output = ListObjectsOutput;

    fn name(&self) -> &'static str {
        "ListObjects"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::FanOut
    }

    async fn resolve(&self, orchestrator: &Orchestrator) -> Result<ListObjectsOutput> {
        Ok(orchestrator.list_objects(&self.input.bucket).await)
    }
}
