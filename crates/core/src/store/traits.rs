//! Trait definitions for the store module.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use super::error::StoreError;

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// Read-only access to one bucket.
///
/// Implementations hold no per-call state beyond connection reuse, so a
/// single instance is shared by every worker.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Lazily list objects whose key starts with `prefix`.
    ///
    /// Pages are fetched only as the stream is polled and the stream ends
    /// after `limit` items. Each call starts a fresh listing.
    fn list<'a>(
        &'a self,
        prefix: &'a str,
        limit: Option<usize>,
    ) -> BoxStream<'a, Result<ObjectSummary, StoreError>>;

    /// Download `key` to `<destination_dir>/<destination_filename or key>`.
    ///
    /// Creates missing directories, overwrites an existing file, and returns
    /// the local path.
    async fn download(
        &self,
        key: &str,
        destination_dir: &Path,
        destination_filename: Option<&str>,
    ) -> Result<PathBuf, StoreError>;
}
