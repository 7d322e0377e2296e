//! The closed set of handlers that turn rule matches into operations.
//!
//! Handlers never touch the filesystem beyond reading through
//! [`FileSystemOps`] (the one-shot handlers hash their script).  All
//! mutation is left to the executor.
pub mod install;
pub mod path;
pub mod shell;
pub mod symlink;

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;
use crate::datastore::DataStore;
use crate::filesystem::FileSystemOps;
use crate::operations::Operation;
use crate::paths::Paths;
use crate::rules::Match;

/// The five handler kinds.
///
/// Variant order is the execution order: one-shot handlers first, then
/// configuration handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    /// Run `install.sh` once per content hash.
    Install,
    /// Run `brew bundle` once per Brewfile content hash.
    Homebrew,
    /// Prepend a directory to `$PATH`.
    Path,
    /// Source a snippet at shell start.
    Shell,
    /// Link a file or directory into `$HOME` / `$XDG_CONFIG_HOME`.
    Symlink,
}

/// Handler categories used by `link` and `provision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Idempotent link-style handlers.
    Configuration,
    /// Sentinel-guarded command handlers.
    OneShot,
}

impl HandlerKind {
    /// All handlers in execution order.
    pub const ALL: [Self; 5] = [
        Self::Install,
        Self::Homebrew,
        Self::Path,
        Self::Shell,
        Self::Symlink,
    ];

    /// Name used in config files and output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Homebrew => "homebrew",
            Self::Path => "path",
            Self::Shell => "shell",
            Self::Symlink => "symlink",
        }
    }

    /// The handler's category.
    #[must_use]
    pub const fn category(self) -> Category {
        match self {
            Self::Install | Self::Homebrew => Category::OneShot,
            Self::Path | Self::Shell | Self::Symlink => Category::Configuration,
        }
    }

    /// Data-store directory holding this handler's sentinels.
    #[must_use]
    pub const fn sentinel_dir(self) -> Option<&'static str> {
        match self {
            Self::Install => Some("install/sentinels"),
            Self::Homebrew => Some("brewfile"),
            _ => None,
        }
    }
}

impl std::fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for HandlerKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|h| h.name() == s).ok_or(())
    }
}

/// Where a shell snippet is sourced, in loader order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Environment setup (exports, `PATH` tweaks).
    Environment,
    /// Login-shell setup.
    Login,
    /// Aliases and functions.
    Aliases,
}

impl Placement {
    /// Name used in rule options and the placement sidecar.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::Login => "login",
            Self::Aliases => "aliases",
        }
    }
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Placement {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "environment" => Ok(Self::Environment),
            "login" => Ok(Self::Login),
            "aliases" => Ok(Self::Aliases),
            _ => Err(()),
        }
    }
}

/// Everything a handler may consult while producing operations.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    /// Resolved locations.
    pub paths: &'a Paths,
    /// Configuration resolved for the pack being processed.
    pub config: &'a Config,
    /// Data-store layout.
    pub store: &'a DataStore,
    /// Read-side filesystem.
    pub fs: &'a dyn FileSystemOps,
}

/// Dispatch `matches` (all produced for `kind`) to the handler.
///
/// # Errors
///
/// Returns an error if a match cannot be handled, e.g. a directory given
/// to a handler that needs a file, or an unreadable install script.
pub fn operations_for(
    kind: HandlerKind,
    matches: &[&Match],
    ctx: &HandlerContext<'_>,
) -> Result<Vec<Operation>> {
    let mut ops = Vec::new();
    for m in matches {
        match kind {
            HandlerKind::Symlink => ops.extend(symlink::operations(m, ctx)),
            HandlerKind::Shell => ops.push(shell::operation(m, ctx)?),
            HandlerKind::Path => ops.push(path::operation(m, ctx)?),
            HandlerKind::Install | HandlerKind::Homebrew => {
                ops.push(install::operation(kind, m, ctx)?);
            }
        }
    }
    Ok(ops)
}

/// Fail when a handler that needs a regular file is given a directory.
pub(crate) fn require_file(kind: HandlerKind, m: &Match) -> Result<()> {
    if m.is_dir {
        anyhow::bail!(
            "{kind} handler expects a file, but {}/{} is a directory",
            m.pack,
            m.relpath
        );
    }
    Ok(())
}
