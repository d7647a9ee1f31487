//! Concrete commands
//!
//! - Fan-out: bucket lifecycle and object operations
//! - Passthrough: copy and native administrative requests

pub mod bucket;
pub mod native;
pub mod object;

pub use bucket::{
    CreateBucketCommand, CreateBucketInput, DeleteBucketCommand, DeleteBucketInput,
    ListBucketsCommand, ListBucketsOutput,
};
pub use native::{
    CopyObjectCommand, CopyObjectInput, CopyObjectOutput, NativeBucketCommand, NativeRequest,
};
pub use object::{
    DeleteObjectCommand, DeleteObjectInput, GetObjectCommand, GetObjectInput, GetObjectOutput,
    ListObjectsCommand, ListObjectsInput, ListObjectsOutput, PutObjectCommand, PutObjectInput,
};
