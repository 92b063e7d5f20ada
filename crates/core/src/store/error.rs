//! Error types for the store module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while listing or downloading objects.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// Transport failure or throttling. Worth another try later.
    #[error("network error on {key}: {message}")]
    Network { key: String, message: String },

    /// The bucket refused the anonymous request.
    #[error("permission denied on {key}")]
    PermissionDenied { key: String },

    /// Cannot create or write the destination.
    #[error("filesystem error at {path}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The key would resolve outside the destination directory.
    #[error("invalid object key: {key}")]
    InvalidKey { key: String },

    /// Any other store response.
    #[error("object store error: {message}")]
    Service { message: String },
}

impl StoreError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Short label for metrics and failure records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Network { .. } => "network",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::Filesystem { .. } => "filesystem",
            Self::InvalidKey { .. } => "invalid_key",
            Self::Service { .. } => "service",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_errors_are_transient() {
        let network = StoreError::Network {
            key: "a".to_string(),
            message: "connection reset".to_string(),
        };
        assert!(network.is_transient());

        let denied = StoreError::PermissionDenied {
            key: "a".to_string(),
        };
        assert!(!denied.is_transient());

        let fs = StoreError::filesystem(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert!(!fs.is_transient());
        assert_eq!(fs.kind(), "filesystem");
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::NotFound {
            key: "gfs.20201215/00/gfs.t00z.pgrb2.0p25.f003".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "object not found: gfs.20201215/00/gfs.t00z.pgrb2.0p25.f003"
        );
    }
}
