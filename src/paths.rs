//! Resolution of `$HOME`, XDG directories, and the data store location.
use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::error::UserInputError;

/// Every filesystem location the engine reads from or writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// User home directory.
    pub home: PathBuf,
    /// `$XDG_CONFIG_HOME`, defaulting to `~/.config`.
    pub xdg_config_home: PathBuf,
    /// `$XDG_DATA_HOME`, defaulting to `~/.local/share`.
    pub xdg_data_home: PathBuf,
    /// The data store root.
    pub data_dir: PathBuf,
    /// The dotfiles root; never written.
    pub dotfiles_root: PathBuf,
}

impl Paths {
    /// Resolve paths from the process environment.
    ///
    /// The dotfiles root is taken from `root_flag`, then `$DOTFILES_ROOT`,
    /// then the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `$HOME` is unset or the dotfiles root does not
    /// exist.
    pub fn from_env(root_flag: Option<&Path>) -> Result<Self> {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow::anyhow!("HOME environment variable is not set"))?;
        let dotfiles_root = resolve_root(root_flag)?;
        Ok(Self::resolve(
            home,
            env_path("XDG_CONFIG_HOME"),
            env_path("XDG_DATA_HOME"),
            env_path("DODOT_DATA_DIR"),
            dotfiles_root,
        ))
    }

    /// Build paths from explicit values, applying the XDG fallbacks.
    ///
    /// Precedence for the data store is `data_dir_override`, then
    /// `<xdg_data_home>/dodot`, then `~/.local/share/dodot`.
    #[must_use]
    pub fn resolve(
        home: PathBuf,
        xdg_config_home: Option<PathBuf>,
        xdg_data_home: Option<PathBuf>,
        data_dir_override: Option<PathBuf>,
        dotfiles_root: PathBuf,
    ) -> Self {
        let xdg_config_home = xdg_config_home.unwrap_or_else(|| home.join(".config"));
        let xdg_data_home = xdg_data_home.unwrap_or_else(|| home.join(".local").join("share"));
        let data_dir = data_dir_override.unwrap_or_else(|| xdg_data_home.join("dodot"));
        Self {
            home,
            xdg_config_home,
            xdg_data_home,
            data_dir,
            dotfiles_root,
        }
    }

    /// Expand a user-supplied target: absolute paths are kept, `~/x` and
    /// relative paths land under `$HOME`.
    #[must_use]
    pub fn expand_target(&self, raw: &str) -> PathBuf {
        if let Some(rest) = raw.strip_prefix("~/") {
            return self.home.join(rest);
        }
        if raw == "~" {
            return self.home.clone();
        }
        let p = Path::new(raw);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.home.join(p)
        }
    }

    /// Render `path` with `$HOME` abbreviated to `~` for display.
    #[must_use]
    pub fn display(&self, path: &Path) -> String {
        path.strip_prefix(&self.home).map_or_else(
            |_| path.display().to_string(),
            |rest| format!("~/{}", rest.display()),
        )
    }
}

/// Read a non-empty environment variable as a path.
fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Resolve the dotfiles root: explicit flag, then `$DOTFILES_ROOT`, then cwd.
///
/// # Errors
///
/// Returns [`UserInputError::NoDotfilesRoot`] if the chosen directory does
/// not exist.
pub fn resolve_root(flag: Option<&Path>) -> Result<PathBuf> {
    let candidate = match flag {
        Some(p) => p.to_path_buf(),
        None => match env_path("DOTFILES_ROOT") {
            Some(p) => p,
            None => std::env::current_dir()?,
        },
    };
    if !candidate.is_dir() {
        return Err(UserInputError::NoDotfilesRoot(candidate).into());
    }
    Ok(dunce::canonicalize(&candidate).unwrap_or(candidate))
}
