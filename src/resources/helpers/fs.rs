//! File-system resource helpers.
use anyhow::{Context as _, Result};
use std::path::Path;

/// Mode for directories dodot creates.
pub const DIR_MODE: u32 = 0o755;

/// Ensure the parent directory of `path` exists, creating missing
/// ancestors with mode `0755`.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    Ok(())
}

/// `create_dir_all` with mode `0755` on Unix.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn create_dir_all(dir: &Path) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder
        .create(dir)
        .with_context(|| format!("create parent: {}", dir.display()))
}

/// Remove an existing file or symlink at `path`, including broken symlinks.
///
/// Does nothing if `path` does not exist.  A real directory is removed
/// recursively.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_existing(path: &Path) -> Result<()> {
    let Ok(meta) = path.symlink_metadata() else {
        return Ok(());
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
    .with_context(|| format!("remove existing: {}", path.display()))
}

/// Human description of whatever occupies `path`, for conflict messages.
#[must_use]
pub fn describe_existing(path: &Path) -> String {
    match path.symlink_metadata() {
        Ok(meta) if meta.is_symlink() => std::fs::read_link(path).map_or_else(
            |_| "symlink".to_string(),
            |dest| format!("symlink to {}", dest.display()),
        ),
        Ok(meta) if meta.is_dir() => "directory".to_string(),
        Ok(_) => "regular file".to_string(),
        Err(_) => "nothing".to_string(),
    }
}
