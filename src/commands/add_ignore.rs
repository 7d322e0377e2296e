//! `add-ignore`: write a pack's ignore file.
use anyhow::{Context as _, Result};
use std::path::PathBuf;

use crate::cli::{AddIgnoreOpts, GlobalOpts};
use crate::config::Config;
use crate::error::UserInputError;
use crate::filesystem::SystemFileSystemOps;
use crate::logging::Log;
use crate::paths::resolve_root;

/// Run the add-ignore command.
///
/// # Errors
///
/// Returns [`UserInputError::UnknownPack`] if `pack` is not a directory of
/// the dotfiles root, or an error if the ignore file cannot be written.
pub fn run(global: &GlobalOpts, opts: &AddIgnoreOpts, log: &dyn Log) -> Result<()> {
    let root = resolve_root(global.dotfiles_root.as_deref())?;
    let config = Config::load(&root, &SystemFileSystemOps)?;
    let marker = ignore_file(&root, &opts.pack, &config)?;

    if marker.exists() {
        log.info(&format!("{} is already ignored", opts.pack));
        return Ok(());
    }
    if global.dry_run {
        log.dry_run(&format!("would create {}", marker.display()));
        return Ok(());
    }
    std::fs::write(&marker, "")
        .with_context(|| format!("write ignore file: {}", marker.display()))?;
    log.info(&format!("created {}", marker.display()));
    Ok(())
}

fn ignore_file(root: &std::path::Path, pack: &str, config: &Config) -> Result<PathBuf> {
    let dir = root.join(pack);
    if pack.is_empty() || pack.contains('/') || pack.starts_with('.') || !dir.is_dir() {
        return Err(UserInputError::UnknownPack(pack.to_string()).into());
    }
    Ok(dir.join(&config.special_files.ignore_file))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::Logger;

    fn global(root: &std::path::Path, dry_run: bool) -> GlobalOpts {
        GlobalOpts {
            dry_run,
            force: false,
            dotfiles_root: Some(root.to_path_buf()),
        }
    }

    fn opts(pack: &str) -> AddIgnoreOpts {
        AddIgnoreOpts { pack: pack.into() }
    }

    #[test]
    fn writes_ignore_file_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("scratch")).unwrap();
        let log = Logger::new("test");

        run(&global(dir.path(), false), &opts("scratch"), &log).unwrap();
        assert!(dir.path().join("scratch/.dodotignore").is_file());
        run(&global(dir.path(), false), &opts("scratch"), &log).unwrap();
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("scratch")).unwrap();
        run(&global(dir.path(), true), &opts("scratch"), &Logger::new("test")).unwrap();
        assert!(!dir.path().join("scratch/.dodotignore").exists());
    }

    #[test]
    fn unknown_pack_is_user_error() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["absent", "../x", ".git"] {
            let err = run(&global(dir.path(), false), &opts(name), &Logger::new("test"))
                .unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<UserInputError>(),
                    Some(UserInputError::UnknownPack(_))
                ),
                "{name}: {err}"
            );
        }
    }
}
