//! Local destination layout.

use std::path::{Component, Path, PathBuf};

use super::error::StoreError;

/// Resolve where an object lands locally.
///
/// The key (or the explicit filename) is joined below `destination_dir`, so
/// its `/`-separated segments become subdirectories. Absolute keys and keys
/// containing `..` are rejected.
pub fn destination_path(
    destination_dir: &Path,
    key: &str,
    destination_filename: Option<&str>,
) -> Result<PathBuf, StoreError> {
    let relative = destination_filename.unwrap_or(key);
    let invalid = || StoreError::InvalidKey {
        key: relative.to_string(),
    };

    if relative.is_empty() || relative.ends_with('/') {
        return Err(invalid());
    }

    let relative_path = Path::new(relative);
    let mut named = false;
    for component in relative_path.components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(invalid())
            }
        }
    }
    if !named {
        return Err(invalid());
    }

    Ok(destination_dir.join(relative_path))
}

/// Create `dir` and its parents if missing.
///
/// Several tasks may race to create the same directory; every one of them
/// succeeds.
pub async fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| StoreError::filesystem(dir, e))
}

/// Create the parent directory of a destination file.
pub(crate) async fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent).await,
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_destination_mirrors_key_hierarchy() {
        let path = destination_path(Path::new("/tmp/x"), "gfs.D/R/f.f003", None).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/x/gfs.D/R/f.f003"));
    }

    #[test]
    fn test_destination_filename_overrides_key() {
        let path = destination_path(
            Path::new("/data"),
            "gfs.20201215/00/gfs.t00z.pgrb2.0p25.f003",
            Some("latest.grib2"),
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/data/latest.grib2"));
    }

    #[test]
    fn test_destination_rejects_escaping_keys() {
        for key in ["../etc/passwd", "/etc/passwd", "a/../../b", "", "dir/", "."] {
            assert!(
                matches!(
                    destination_path(Path::new("/data"), key, None),
                    Err(StoreError::InvalidKey { .. })
                ),
                "{key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_ensure_dir_tolerates_concurrent_creators() {
        let temp_dir = TempDir::new().unwrap();
        let target = Arc::new(temp_dir.path().join("gfs.20201215").join("00"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let target = Arc::clone(&target);
                tokio::spawn(async move { ensure_dir(&target).await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn test_ensure_dir_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a/b/c");
        ensure_dir(&target).await.unwrap();
        ensure_dir(&target).await.unwrap();
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn test_ensure_dir_fails_when_a_file_is_in_the_way() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = ensure_dir(&blocker.join("child")).await;
        assert!(matches!(result, Err(StoreError::Filesystem { .. })));
    }
}
