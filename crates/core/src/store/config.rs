//! Configuration for the store module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Available object store backends.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Public S3 bucket, anonymous requests.
    #[default]
    S3,
    /// Directory tree used as a bucket mirror.
    Local,
}

/// Object store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Bucket holding the forecast products.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Override the S3 endpoint (S3-compatible mirrors).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    /// Connection timeout in seconds (default: 10).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Keys requested per listing page (S3 caps this at 1000).
    #[serde(default = "default_page_size")]
    pub list_page_size: usize,

    /// Root directory of the `local` backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

fn default_bucket() -> String {
    "noaa-gfs-bdp-pds".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_page_size() -> usize {
    1000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            bucket: default_bucket(),
            region: default_region(),
            endpoint_url: None,
            connect_timeout_secs: default_connect_timeout(),
            list_page_size: default_page_size(),
            root: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.backend, StoreBackend::S3);
        assert_eq!(config.bucket, "noaa-gfs-bdp-pds");
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.list_page_size, 1000);
        assert!(config.root.is_none());
    }

    #[test]
    fn test_deserialize_local_backend() {
        let toml = r#"
            backend = "local"
            root = "/srv/mirror"
        "#;
        let config: StoreConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.backend, StoreBackend::Local);
        assert_eq!(config.root, Some(PathBuf::from("/srv/mirror")));
        assert_eq!(config.bucket, "noaa-gfs-bdp-pds");
    }
}
