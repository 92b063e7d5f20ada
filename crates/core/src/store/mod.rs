//! Read-only object store access.
//!
//! This module provides the `ObjectStore` trait for prefix listing and
//! single-object download, with two backends:
//!
//! - `S3ObjectStore`: anonymous access to a public S3 bucket
//! - `LocalObjectStore`: a directory tree standing in for a bucket
//!
//! Downloads land at `<destination_dir>/<key>`; intermediate directories
//! mirroring the key hierarchy are created on demand. There is no resume and
//! no checksum: an interrupted transfer can leave a truncated file behind.

mod config;
mod error;
mod local;
mod paths;
mod s3;
mod traits;

pub use config::{StoreBackend, StoreConfig};
pub use error::StoreError;
pub use local::LocalObjectStore;
pub use paths::{destination_path, ensure_dir};
pub use s3::S3ObjectStore;
pub use traits::{ObjectStore, ObjectSummary};

use std::sync::Arc;

/// Build the store selected by configuration.
pub async fn create_object_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>, StoreError> {
    match config.backend {
        StoreBackend::S3 => Ok(Arc::new(S3ObjectStore::from_config(config).await)),
        StoreBackend::Local => {
            let root = config.root.clone().ok_or_else(|| StoreError::Service {
                message: "local store backend requires store.root".to_string(),
            })?;
            Ok(Arc::new(LocalObjectStore::new(root)))
        }
    }
}
