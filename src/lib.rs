//! Dotfiles deployment engine.
//!
//! A dotfiles root holds packs (top-level directories).  Each pack entry is
//! matched against an ordered rule list, bound to one of five handlers, and
//! deployed through a data store: user-visible links point at intermediate
//! links under `deployed/`, which point at the real files.  One-shot scripts
//! run once per content hash, guarded by sentinels.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**, **[`packs`]**, **[`rules`]**: layered TOML configuration,
//!   pack discovery, and entry classification
//! - **[`handlers`]**, **[`plan`]**, **[`operations`]**: pure planning from
//!   matches to ordered operations
//! - **[`resources`]**, **[`executor`]**, **[`datastore`]**: idempotent
//!   `check + apply` primitives and their materialisation
//! - **[`commands`]**: top-level subcommand orchestration (`on`, `off`,
//!   `status`, `link`, `provision`, `add-ignore`, `version`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod error;
pub mod exec;
pub mod executor;
pub mod filesystem;
pub mod handlers;
pub mod logging;
pub mod operations;
pub mod packs;
pub mod paths;
pub mod plan;
pub mod resources;
pub mod rules;
pub mod shell;
pub mod status;
