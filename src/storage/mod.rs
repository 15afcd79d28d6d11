//! Object storage for uploaded asset images
//!
//! Uploads land in an S3-compatible bucket and come back as a public URL
//! that clients can store on the asset record.

pub mod s3;

pub use s3::S3Store;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;

/// Storage backend interface
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a file under `key` and return its public URL
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError>;
}
