//! Read-side filesystem abstraction for dependency injection.
//!
//! The scanner, rule engine, and handlers only ever *read* the dotfiles
//! tree.  They do so through [`FileSystemOps`] so they can be unit-tested
//! against [`MockFileSystemOps`] without touching disk.  Writes happen in
//! [`crate::resources`] and [`crate::datastore`] against the real
//! filesystem.

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

/// Abstraction over the filesystem queries used while planning.
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `path` exists (following symlinks).
    fn exists(&self, path: &Path) -> bool;

    /// Returns `true` if `path` is a directory (following symlinks).
    fn is_dir(&self, path: &Path) -> bool;

    /// Returns the immediate child paths inside `path`, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` cannot be opened or read as a directory.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Read the target of the symbolic link at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not a symlink or cannot be read.
    fn read_link(&self, path: &Path) -> std::io::Result<PathBuf>;

    /// Read the whole file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Read the file at `path` as UTF-8, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    fn read_to_string_opt(&self, path: &Path) -> Result<Option<String>> {
        if !self.exists(path) {
            return Ok(None);
        }
        let bytes = self.read(path)?;
        String::from_utf8(bytes)
            .map(Some)
            .with_context(|| format!("{} is not valid UTF-8", path.display()))
    }
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = std::fs::read_dir(path)
            .with_context(|| format!("reading directory {}", path.display()))?
            .map(|e| e.map(|entry| entry.path()).map_err(Into::into))
            .collect::<Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    fn read_link(&self, path: &Path) -> std::io::Result<PathBuf> {
        std::fs::read_link(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))
    }
}

/// Mock [`FileSystemOps`] for unit tests.
///
/// Pre-configure files, directories, and symlinks with the builder-style
/// methods, then pass `Arc::new(mock)` wherever a [`FileSystemOps`] is
/// accepted.
///
/// ```ignore
/// let fs = MockFileSystemOps::new()
///     .with_dir_entries("/dots", vec![PathBuf::from("/dots/vim")])
///     .with_dir_entries("/dots/vim", vec![PathBuf::from("/dots/vim/vimrc")])
///     .with_file("/dots/vim/vimrc", "set nocompatible\n");
/// ```
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockFileSystemOps {
    files: std::collections::HashMap<PathBuf, Vec<u8>>,
    dirs: std::collections::HashMap<PathBuf, Vec<PathBuf>>,
    symlinks: std::collections::HashMap<PathBuf, PathBuf>,
}

#[cfg(test)]
impl MockFileSystemOps {
    /// Create an empty mock with nothing configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a regular file with `content`.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: &str) -> Self {
        self.files.insert(path.into(), content.as_bytes().to_vec());
        self
    }

    /// Set the entries returned by [`FileSystemOps::read_dir`] for `dir`.
    ///
    /// Also marks `dir` itself as an existing directory.
    #[must_use]
    pub fn with_dir_entries(mut self, dir: impl Into<PathBuf>, entries: Vec<PathBuf>) -> Self {
        self.dirs.insert(dir.into(), entries);
        self
    }

    /// Register `path` as a symbolic link pointing to `target`.
    #[must_use]
    pub fn with_symlink(mut self, path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        self.symlinks.insert(path.into(), target.into());
        self
    }
}

#[cfg(test)]
impl FileSystemOps for MockFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
            || self.dirs.contains_key(path)
            || self.symlinks.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains_key(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = self
            .dirs
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("mock: no entries configured for {}", path.display()))?;
        entries.sort();
        Ok(entries)
    }

    fn read_link(&self, path: &Path) -> std::io::Result<PathBuf> {
        self.symlinks
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("mock: no such file {}", path.display()))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // SystemFileSystemOps
    // -----------------------------------------------------------------------

    #[test]
    fn system_read_dir_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zsh", "git", "vim"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        let entries = SystemFileSystemOps.read_dir(dir.path()).unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["git", "vim", "zsh"]);
    }

    #[test]
    fn system_read_to_string_opt_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let got = SystemFileSystemOps
            .read_to_string_opt(&dir.path().join("nope.toml"))
            .unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn system_read_to_string_opt_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.toml");
        std::fs::write(&path, "x = 1\n").unwrap();
        let got = SystemFileSystemOps.read_to_string_opt(&path).unwrap();
        assert_eq!(got.as_deref(), Some("x = 1\n"));
    }

    // -----------------------------------------------------------------------
    // MockFileSystemOps
    // -----------------------------------------------------------------------

    #[test]
    fn mock_distinguishes_files_and_dirs() {
        let fs = MockFileSystemOps::new()
            .with_dir_entries("/d", vec![PathBuf::from("/d/f")])
            .with_file("/d/f", "hi");
        assert!(fs.is_dir(Path::new("/d")));
        assert!(!fs.is_dir(Path::new("/d/f")));
        assert!(fs.exists(Path::new("/d/f")));
        assert_eq!(fs.read(Path::new("/d/f")).unwrap(), b"hi");
    }

    #[test]
    fn mock_read_link_missing_is_not_found() {
        let fs = MockFileSystemOps::new();
        let err = fs.read_link(Path::new("/nope")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
