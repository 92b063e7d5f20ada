//! Configuration for post-processing hooks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PostProcessConfig {
    /// Program and leading arguments; the downloaded path is appended.
    #[serde(default)]
    pub command: Option<Vec<String>>,

    /// Only log each downloaded path.
    #[serde(default)]
    pub log_only: bool,

    /// Kill the command after this many seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    600
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            command: None,
            log_only: false,
            timeout_secs: default_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_command() {
        let config: PostProcessConfig =
            toml::from_str(r#"command = ["wgrib2", "-s"]"#).unwrap();
        assert_eq!(
            config.command,
            Some(vec!["wgrib2".to_string(), "-s".to_string()])
        );
        assert!(!config.log_only);
        assert_eq!(config.timeout_secs, 600);
    }
}
