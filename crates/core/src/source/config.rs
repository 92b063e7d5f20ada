//! Configuration for the source module.

use serde::{Deserialize, Serialize};

/// Known source variants.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// NOAA Global Forecast System output.
    #[default]
    Gfs,
}

/// Data source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    /// Model name used in keys (e.g., "gfs").
    #[serde(default = "default_model")]
    pub model: String,

    /// Product suffix used in keys (e.g., "pgrb2.0p25").
    #[serde(default = "default_product")]
    pub product: String,
}

fn default_model() -> String {
    "gfs".to_string()
}

fn default_product() -> String {
    "pgrb2.0p25".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            model: default_model(),
            product: default_product(),
        }
    }
}
