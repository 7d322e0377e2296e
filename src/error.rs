//! Domain-specific error types for the deployment engine.
//!
//! Internal modules return typed errors where the kind matters to the
//! caller (exit codes, per-file reporting) and [`anyhow::Error`] with
//! context elsewhere.  The binary downcasts at the top level to choose an
//! exit code via [`exit_code`].
//!
//! # Error hierarchy
//!
//! ```text
//! DodotError
//! ├── Config(ConfigError)      : TOML parse, unknown handler, bad pattern
//! ├── UserInput(UserInputError): unknown pack, missing root, lock held
//! ├── Filesystem               : I/O on a source or the data store
//! ├── Conflict                 : target exists and is not ours
//! ├── ProtectedPath            : target is on the deny-list
//! ├── CommandFailed            : install script / Brewfile exited non-zero
//! ├── Interrupted              : SIGINT received during the run
//! └── Internal                 : bug
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Exit code for a successful run.
pub const EXIT_OK: u8 = 0;
/// Exit code when at least one operation failed.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for user and configuration errors.
pub const EXIT_USAGE: u8 = 2;

/// Top-level error type for the deployment engine.
#[derive(Error, Debug)]
pub enum DodotError {
    /// Configuration could not be loaded or validated.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The user asked for something that cannot be done.
    #[error("{0}")]
    UserInput(#[from] UserInputError),

    /// An I/O failure on a source file or in the data store.
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The user target exists and is not owned by the data store.
    #[error("conflict: {} already exists ({existing})", .target.display())]
    Conflict {
        /// User-visible path that would be written.
        target: PathBuf,
        /// Description of what currently occupies the target.
        existing: String,
    },

    /// The target lies on the protected-path deny-list.
    #[error("protected path: refusing to write {}", .target.display())]
    ProtectedPath {
        /// User-visible path that would be written.
        target: PathBuf,
    },

    /// A one-shot command exited non-zero.
    #[error("command failed (exit {}): {command}", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    CommandFailed {
        /// Command line that was run.
        command: String,
        /// Exit status, or `None` when terminated by a signal.
        code: Option<i32>,
    },

    /// The run was interrupted before this operation could execute.
    #[error("interrupted")]
    Interrupted,

    /// Unreachable state; indicates a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DodotError {
    /// Exit code the binary should use when this error ends the run.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::UserInput(_) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }
}

/// Errors that arise from configuration loading and rule validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A config file contains invalid TOML or an unexpected shape.
    #[error("invalid TOML in {}: {source}", .path.display())]
    Parse {
        /// Path to the offending file (`<embedded defaults>` for the built-in layer).
        path: PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },

    /// A config file exists but could not be read.
    #[error("IO error reading config file {}: {source}", .path.display())]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A rule names a handler that does not exist.
    #[error("rule '{pattern}' names unknown handler '{handler}'")]
    UnknownHandler {
        /// Rule pattern.
        pattern: String,
        /// Handler name as written.
        handler: String,
    },

    /// A positive rule has no handler.
    #[error("rule '{pattern}' has no handler")]
    MissingHandler {
        /// Rule pattern.
        pattern: String,
    },

    /// A rule or ignore pattern is not a valid glob.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Pattern as written.
        pattern: String,
        /// Underlying glob error.
        source: glob::PatternError,
    },

    /// A rule option has a value the handler does not accept.
    #[error("rule '{pattern}': invalid value '{value}' for option '{option}'")]
    InvalidOption {
        /// Rule pattern.
        pattern: String,
        /// Option key.
        option: String,
        /// Value as written.
        value: String,
    },
}

/// Errors caused by user input rather than by the filesystem.
#[derive(Error, Debug)]
pub enum UserInputError {
    /// A pack named on the command line does not exist (or is ignored).
    #[error("unknown pack '{0}'")]
    UnknownPack(String),

    /// The dotfiles root does not exist or is not a directory.
    #[error("dotfiles root not found: {}", .0.display())]
    NoDotfilesRoot(PathBuf),

    /// Another dodot process holds the data-store lock.
    #[error("another dodot process is running (lock held on {})", .0.display())]
    Locked(PathBuf),
}

/// Choose the process exit code for an error returned from a command.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<DodotError>() {
        return e.exit_code();
    }
    if err.downcast_ref::<ConfigError>().is_some() || err.downcast_ref::<UserInputError>().is_some()
    {
        return EXIT_USAGE;
    }
    EXIT_FAILURE
}
