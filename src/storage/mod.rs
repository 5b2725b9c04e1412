//! Object storage used to stage the input file.
//!
//! A store is bound to one bucket at construction. [`FsObjectStore`] keeps
//! buckets as directories, `S3ObjectStore` (feature `aws`) talks to S3.

use crate::error::StorageError;
use async_trait::async_trait;
use std::fmt;
use std::io::Cursor;
use std::path::Path;

mod fs;
#[cfg(feature = "aws")]
mod s3;

pub use fs::FsObjectStore;
#[cfg(feature = "aws")]
pub use s3::S3ObjectStore;

/// A downloaded object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object body
    pub bytes: Vec<u8>,
    /// `Content-Type` reported by the store
    pub content_type: Option<String>,
}

impl StoredObject {
    /// Body as a buffered reader
    #[must_use]
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.bytes.as_slice())
    }
}

/// Key addressed blob store scoped to one bucket
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// Bucket the store writes to
    fn bucket(&self) -> &str;

    /// Upload `local_file` under `key`, replacing any existing object
    async fn put(&self, key: &str, local_file: &Path) -> Result<(), StorageError>;

    /// Download the object stored under `key`
    async fn get(&self, key: &str) -> Result<StoredObject, StorageError>;

    /// Delete `key`, succeeding if it is already gone
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Names of every bucket visible to the caller
    async fn list_buckets(&self) -> Result<Vec<String>, StorageError>;
}
