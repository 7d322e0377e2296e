//! Pack discovery and selection.
use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::config::toml_loader::{RawConfig, load_config};
use crate::error::{ConfigError, UserInputError};
use crate::filesystem::FileSystemOps;

/// A pack: one top-level directory of the dotfiles root.
#[derive(Debug, Clone)]
pub struct Pack {
    /// Directory basename.
    pub name: String,
    /// Absolute path.
    pub path: PathBuf,
    /// The pack's own config layer (empty when it has none).
    pub config: RawConfig,
}

/// A direct child of a pack directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackEntry {
    /// Basename.
    pub name: String,
    /// Absolute path.
    pub path: PathBuf,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl Pack {
    /// Layer this pack's config over the root config.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the pack config contains an invalid rule.
    pub fn resolve_config(&self, root: &Config) -> Result<Config, ConfigError> {
        root.for_pack(&self.config)
    }

    /// List the pack's direct children (depth 1), sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the pack directory cannot be read.
    pub fn entries(&self, fs: &dyn FileSystemOps) -> Result<Vec<PackEntry>> {
        Ok(fs
            .read_dir(&self.path)?
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().to_string();
                let is_dir = fs.is_dir(&path);
                Some(PackEntry { name, path, is_dir })
            })
            .collect())
    }
}

/// Enumerates packs under a dotfiles root.
#[derive(Debug)]
pub struct Scanner<'a> {
    root: &'a Path,
    config: &'a Config,
    fs: &'a dyn FileSystemOps,
}

impl<'a> Scanner<'a> {
    /// Create a scanner over `root` using the resolved root `config`.
    #[must_use]
    pub const fn new(root: &'a Path, config: &'a Config, fs: &'a dyn FileSystemOps) -> Self {
        Self { root, config, fs }
    }

    /// Names and paths of every deployable pack, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be read or an ignore pattern is
    /// invalid.
    pub fn discover(&self) -> Result<Vec<(String, PathBuf)>> {
        let ignore = compile(&self.config.pack_ignore)?;
        let mut packs = Vec::new();
        for path in self.fs.read_dir(self.root)? {
            if !self.fs.is_dir(&path) {
                continue;
            }
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            if ignore.iter().any(|p| p.matches(&name)) {
                continue;
            }
            if self
                .fs
                .exists(&path.join(&self.config.special_files.ignore_file))
            {
                continue;
            }
            packs.push((name, path));
        }
        packs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(packs)
    }

    /// Select packs by name (all packs when `names` is empty) and load their
    /// configs.
    ///
    /// # Errors
    ///
    /// Returns [`UserInputError::UnknownPack`] for a name that is not a
    /// deployable pack, and a [`ConfigError`] for a malformed pack config.
    pub fn select(&self, names: &[String]) -> Result<Vec<Pack>> {
        let discovered = self.discover()?;
        let chosen: Vec<(String, PathBuf)> = if names.is_empty() {
            discovered
        } else {
            for name in names {
                if !discovered.iter().any(|(n, _)| n == name) {
                    return Err(UserInputError::UnknownPack(name.clone()).into());
                }
            }
            discovered
                .into_iter()
                .filter(|(n, _)| names.contains(n))
                .collect()
        };

        chosen
            .into_iter()
            .map(|(name, path)| -> Result<Pack> {
                let config_path = path.join(&self.config.special_files.pack_config);
                let config: RawConfig = load_config(self.fs, &config_path)?;
                Ok(Pack { name, path, config })
            })
            .collect()
    }
}

fn compile(patterns: &[String]) -> Result<Vec<glob::Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|source| ConfigError::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}
