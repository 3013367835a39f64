//! Deterministic placement of the cached artifact under a cache root.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{FetchError, FetchResult};

/// Fixed file name of the cached raw matrix.
pub const ARTIFACT_FILENAME: &str = "olivetti_faces.bin.gz";

/// Resolves `<root>/<ARTIFACT_FILENAME>` and makes sure the root exists.
#[derive(Debug, Clone)]
pub struct CacheLocator {
    root: PathBuf,
}

impl CacheLocator {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the artifact; does not touch the filesystem.
    pub fn artifact_path(&self) -> PathBuf {
        self.root.join(ARTIFACT_FILENAME)
    }

    /// Create the root directory (and parents) and return the artifact path.
    ///
    /// # Errors
    /// Returns [`FetchError::Filesystem`] if the directory cannot be created,
    /// e.g. permission denied or a regular file in the way.
    pub fn ensure(&self) -> FetchResult<PathBuf> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| FetchError::filesystem(&self.root, e))?;
        let path = self.artifact_path();
        debug!("Cache artifact path: {}", path.display());
        Ok(path)
    }

    /// Whether the artifact has been written.
    pub fn exists(&self) -> bool {
        self.artifact_path().is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_creates_nested_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("a").join("b").join("c");
        let locator = CacheLocator::new(&root);

        let path = locator.ensure().unwrap();
        assert!(root.is_dir());
        assert_eq!(path, root.join(ARTIFACT_FILENAME));
        assert!(!locator.exists());
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let locator = CacheLocator::new(temp_dir.path());
        let first = locator.ensure().unwrap();
        let second = locator.ensure().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ensure_fails_when_root_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = CacheLocator::new(blocker.join("cache")).ensure().unwrap_err();
        assert!(matches!(err, FetchError::Filesystem { .. }));
    }

    #[test]
    fn test_exists_tracks_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let locator = CacheLocator::new(temp_dir.path());
        let path = locator.ensure().unwrap();
        std::fs::write(&path, b"x").unwrap();
        assert!(locator.exists());
    }
}
