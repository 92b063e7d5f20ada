//! Filesystem-backed store.
//!
//! Treats a directory tree as a bucket: the key `a/b/c` is the file
//! `<root>/a/b/c`. Useful for offline mirrors and for exercising the
//! pipeline end to end without network access.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::{debug, info};

use super::error::StoreError;
use super::paths::{destination_path, ensure_parent};
use super::traits::{ObjectStore, ObjectSummary};

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn name(&self) -> &str {
        "local"
    }

    fn list<'a>(
        &'a self,
        prefix: &'a str,
        limit: Option<usize>,
    ) -> BoxStream<'a, Result<ObjectSummary, StoreError>> {
        let objects = stream::once(collect_matching(&self.root, prefix))
            .map_ok(|found| stream::iter(found.into_iter().map(Ok)))
            .try_flatten();

        match limit {
            Some(limit) => objects.take(limit).boxed(),
            None => objects.boxed(),
        }
    }

    async fn download(
        &self,
        key: &str,
        destination_dir: &Path,
        destination_filename: Option<&str>,
    ) -> Result<PathBuf, StoreError> {
        let source = destination_path(&self.root, key, None)?;
        let path = destination_path(destination_dir, key, destination_filename)?;

        match tokio::fs::metadata(&source).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(StoreError::NotFound { key: key.to_string() }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound { key: key.to_string() })
            }
            Err(e) => return Err(StoreError::filesystem(&source, e)),
        }

        ensure_parent(&path).await?;

        info!(root = %self.root.display(), key, path = %path.display(), "Copying object");
        tokio::fs::copy(&source, &path)
            .await
            .map_err(|e| StoreError::filesystem(&path, e))?;

        Ok(path)
    }
}

/// Every file below `root` whose key starts with `prefix`, sorted by key.
async fn collect_matching(root: &Path, prefix: &str) -> Result<Vec<ObjectSummary>, StoreError> {
    // Start from the deepest directory the prefix names.
    let start_key = match prefix.rfind('/') {
        Some(idx) => &prefix[..idx],
        None => "",
    };
    if start_key.split('/').any(|segment| segment == "..") {
        return Ok(Vec::new());
    }

    debug!(root = %root.display(), prefix, "Listing local objects");

    let mut found = Vec::new();
    let mut pending = vec![start_key.to_string()];

    while let Some(dir_key) = pending.pop() {
        let dir = if dir_key.is_empty() {
            root.to_path_buf()
        } else {
            root.join(&dir_key)
        };

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound || e.kind() == ErrorKind::NotADirectory => {
                continue
            }
            Err(e) => return Err(StoreError::filesystem(&dir, e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::filesystem(&dir, e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let key = if dir_key.is_empty() {
                name
            } else {
                format!("{}/{}", dir_key, name)
            };

            let meta = entry
                .metadata()
                .await
                .map_err(|e| StoreError::filesystem(entry.path(), e))?;

            if meta.is_dir() {
                if key.starts_with(prefix) || prefix.starts_with(&format!("{}/", key)) {
                    pending.push(key);
                }
            } else if key.starts_with(prefix) {
                found.push(ObjectSummary {
                    key,
                    size_bytes: meta.len(),
                    last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
                });
            }
        }
    }

    found.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(found)
}
