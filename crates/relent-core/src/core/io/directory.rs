use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Failed to create directory '{path}': {source}")]
pub struct DirectoryError {
    pub path: String,
    #[source]
    pub source: std::io::Error,
}

/// A scoped output directory, created on construction.
///
/// Files and sub-directories are resolved relative to it, so callers never build
/// paths outside their workspace by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    path: PathBuf,
}

impl Directory {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DirectoryError> {
        let path = path.into();
        std::fs::create_dir_all(&path).map_err(|e| DirectoryError {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside this directory. The file is not created.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// A sub-directory, created if missing.
    pub fn directory(&self, name: &str) -> Result<Directory, DirectoryError> {
        Directory::new(self.path.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn nested_directories_are_created() {
        let root = tempdir().unwrap();
        let dir = Directory::new(root.path().join("run")).unwrap();
        let sub = dir.directory("0").unwrap().directory(".line").unwrap();
        assert!(sub.path().is_dir());
        assert_eq!(dir.file("x.toml"), root.path().join("run").join("x.toml"));
        assert!(!dir.file("x.toml").exists());
    }

    #[test]
    fn creation_fails_below_a_regular_file() {
        let root = tempdir().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        assert!(Directory::new(blocker.join("sub")).is_err());
    }
}
