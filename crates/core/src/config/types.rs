use serde::{Deserialize, Serialize};

pub use crate::availability::{AbsentPolicy, RetryConfig};
pub use crate::orchestrator::DownloadConfig;
pub use crate::postprocess::PostProcessConfig;
pub use crate::source::{SourceConfig, SourceKind};
pub use crate::store::{StoreBackend, StoreConfig};

/// Root configuration
///
/// Every section is optional; an empty file describes anonymous access to
/// the public GFS bucket.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub post_process: PostProcessConfig,
}

/// Retry budgets per check site
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RetrySettings {
    /// The run gate
    #[serde(default)]
    pub run: RetryConfig,
    /// Each timestep's availability check
    #[serde(default)]
    pub timestep: RetryConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_deserialize_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.source.model, "gfs");
        assert_eq!(config.store.backend, StoreBackend::S3);
        assert_eq!(config.store.bucket, "noaa-gfs-bdp-pds");
        assert_eq!(config.download.timesteps, vec![3, 6]);
        assert_eq!(config.retry.run.max_attempts, 6);
        assert_eq!(config.retry.timestep.on_absent, AbsentPolicy::Retry);
        assert!(config.post_process.command.is_none());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[source]
kind = "gfs"
product = "pgrb2.0p50"

[store]
backend = "local"
root = "/mnt/mirror"

[download]
name = "gfs-nightly"
dir = "/data/gfs"
timesteps = [0, 3, 6, 9, 12]
max_concurrent = 2

[retry.run]
max_attempts = 12
initial_delay_secs = 300
backoff_multiplier = 1.5

[retry.timestep]
on_absent = "fail"

[post_process]
command = ["wgrib2", "-s"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.source.product, "pgrb2.0p50");
        assert_eq!(config.store.backend, StoreBackend::Local);
        assert_eq!(config.store.root, Some(PathBuf::from("/mnt/mirror")));
        assert_eq!(config.download.name, "gfs-nightly");
        assert_eq!(config.download.max_concurrent, 2);
        assert_eq!(config.retry.run.max_attempts, 12);
        assert_eq!(config.retry.run.initial_delay_secs, 300);
        assert_eq!(config.retry.timestep.max_attempts, 6);
        assert_eq!(config.retry.timestep.on_absent, AbsentPolicy::Fail);
        assert_eq!(
            config.post_process.command,
            Some(vec!["wgrib2".to_string(), "-s".to_string()])
        );
    }

    #[test]
    fn test_unknown_backend_fails() {
        let result: Result<Config, _> = toml::from_str("[store]\nbackend = \"gcs\"\n");
        assert!(result.is_err());
    }
}
