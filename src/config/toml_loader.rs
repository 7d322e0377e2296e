//! TOML layer parsing.
//!
//! Every layer (embedded defaults, root config, per-pack config) shares
//! the [`RawConfig`] schema.  All fields are optional so that a layer only
//! contributes what it sets.
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConfigError;
use crate::filesystem::FileSystemOps;

/// One configuration layer as written on disk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[pack]`
    pub pack: RawPack,
    /// `[patterns]`
    pub patterns: RawPatterns,
    /// `[symlink]`
    pub symlink: RawLinkPolicy,
    /// `[link_paths]`, accepted as an alias of `[symlink]`.
    pub link_paths: RawLinkPolicy,
    /// `[security]`
    pub security: RawSecurity,
    /// `[special_files]`
    pub special_files: RawSpecialFiles,
    /// `[mappings]`
    pub mappings: RawMappings,
    /// `[[rules]]`; `Some` only when the layer sets the key.
    pub rules: Option<Vec<RawRule>>,
}

/// `[pack]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPack {
    /// File-level ignore globs applied while scanning a pack.
    pub ignore: Vec<String>,
}

/// `[patterns]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPatterns {
    /// Globs on pack directory names that are never treated as packs.
    pub pack_ignore: Vec<String>,
}

/// `[symlink]` / `[link_paths]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLinkPolicy {
    /// Names that always deploy to `$HOME/.<name>`.
    pub force_home: Vec<String>,
    /// Home-relative paths the engine must never write.
    pub protected_paths: Vec<String>,
}

/// `[security]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSecurity {
    /// Home-relative paths the engine must never write.
    pub protected_paths: Vec<String>,
}

/// `[special_files]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSpecialFiles {
    /// Per-pack config file name.
    pub pack_config: Option<String>,
    /// Pack ignore sentinel file name.
    pub ignore_file: Option<String>,
}

/// `[mappings]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMappings {
    /// Directory name handled by the PATH handler.
    pub path: Option<String>,
    /// Install script file name.
    pub install: Option<String>,
    /// Brewfile name.
    pub homebrew: Option<String>,
    /// Shell snippet patterns.
    pub shell: Vec<String>,
    /// Extra file exclusions.
    pub ignore: Vec<String>,
}

/// A `[[rules]]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRule {
    /// Glob pattern; a leading `!` marks an exclusion.
    pub pattern: String,
    /// Handler name.
    pub handler: Option<String>,
    /// Handler options.
    pub options: BTreeMap<String, String>,
}

/// Load a TOML file into `T`, returning `T::default()` when it is absent.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file exists but cannot be read, and
/// [`ConfigError::Parse`] if it is not valid TOML for `T`.
pub fn load_config<T: DeserializeOwned + Default>(
    fs: &dyn FileSystemOps,
    path: &Path,
) -> Result<T, ConfigError> {
    let content = fs.read_to_string_opt(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::other(e.to_string()),
    })?;
    match content {
        Some(text) => parse_str(&text, path),
        None => Ok(T::default()),
    }
}

/// Parse a TOML document, attributing errors to `origin`.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] on invalid TOML.
pub fn parse_str<T: DeserializeOwned>(text: &str, origin: &Path) -> Result<T, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    })
}
