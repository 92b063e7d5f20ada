//! Download configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Defaults for the download stage of a pipeline invocation.
///
/// Every field can be overridden per invocation through `RunParameters`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Name used in logs and in the result.
    #[serde(default = "default_name")]
    pub name: String,

    /// Root directory for downloaded files.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Lead times to fetch, in hours.
    #[serde(default = "default_timesteps")]
    pub timesteps: Vec<u32>,

    /// Maximum remote operations in flight at once (must be >= 1).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_name() -> String {
    "gfs-download".to_string()
}

fn default_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_timesteps() -> Vec<u32> {
    vec![3, 6]
}

fn default_max_concurrent() -> usize {
    5
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            dir: default_dir(),
            timesteps: default_timesteps(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DownloadConfig::default();
        assert_eq!(config.name, "gfs-download");
        assert_eq!(config.timesteps, vec![3, 6]);
        assert_eq!(config.max_concurrent, 5);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            dir = "/var/lib/gfs"
            timesteps = [0, 3, 6, 9]
        "#;
        let config: DownloadConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.dir, PathBuf::from("/var/lib/gfs"));
        assert_eq!(config.timesteps, vec![0, 3, 6, 9]);
        assert_eq!(config.max_concurrent, 5);
    }
}
