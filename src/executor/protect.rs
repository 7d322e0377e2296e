//! Protected-path guard for user-visible links.
use std::path::{Path, PathBuf};

use crate::paths::Paths;

/// Absolute form of each configured protected path.
#[must_use]
pub fn expand(paths: &Paths, protected: &[String]) -> Vec<PathBuf> {
    protected.iter().map(|p| paths.expand_target(p)).collect()
}

/// The protected path a link at `target` would write or expose, if any.
///
/// A link is refused when `target` is a protected path or lies inside one,
/// and when `target` is an ancestor of a protected path that `source`
/// provides (a linked directory would put the file in place).
#[must_use]
pub fn violation<'a>(target: &Path, source: &Path, protected: &'a [PathBuf]) -> Option<&'a Path> {
    protected.iter().map(PathBuf::as_path).find(|p| {
        if target.starts_with(p) {
            return true;
        }
        p.strip_prefix(target)
            .is_ok_and(|rest| source.join(rest).symlink_metadata().is_ok())
    })
}
