//! Storage provider trait for the guarded file store.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// Metadata about a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageObjectMeta {
    /// Entry name within its directory.
    pub name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// MIME type guessed from the extension.
    pub mime_type: Option<String>,
    /// Last modified timestamp.
    pub modified_at: Option<DateTime<Utc>>,
    /// Whether this is a directory.
    pub is_directory: bool,
}

/// How a write treats an existing destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Atomically replace the existing file.
    Overwrite,
    /// Fail with a conflict if the name is taken.
    CreateNew,
    /// Pick the first free `{stem}_{n}{ext}` name.
    Rename,
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Name the data was published under.
    pub name: String,
    /// Bytes written.
    pub size_bytes: u64,
    /// Whether the name differs from the requested one.
    pub renamed: bool,
}

/// A byte stream type used for reading file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for the file store behind the exchange.
///
/// `dir` arguments are paths relative to the provider root and `name`
/// arguments are single path components. Implementations must reject
/// anything that resolves outside the root with a `PathViolation`.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name.
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// List the regular files directly under `dir`.
    async fn list_files(&self, dir: &str) -> AppResult<Vec<StorageObjectMeta>>;

    /// List the directories directly under `dir`.
    async fn list_dirs(&self, dir: &str) -> AppResult<Vec<StorageObjectMeta>>;

    /// Get metadata for the file `name` under `dir`.
    async fn metadata(&self, dir: &str, name: &str) -> AppResult<StorageObjectMeta>;

    /// Stream `length` bytes of `name` starting at `offset`.
    async fn read_range(
        &self,
        dir: &str,
        name: &str,
        offset: u64,
        length: u64,
    ) -> AppResult<ByteStream>;

    /// Write `data` as `name` under `dir`, creating `dir` when missing.
    async fn write(
        &self,
        dir: &str,
        name: &str,
        data: Bytes,
        mode: WriteMode,
    ) -> AppResult<StoredObject>;
}
