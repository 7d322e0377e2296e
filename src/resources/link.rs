//! Symbolic link resource with data-store ownership rules.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::helpers::fs::{describe_existing, ensure_parent_dir, remove_existing};
use super::{Applicable, Resource, ResourceChange, ResourceState};

/// A link at `target` pointing to `source`.
///
/// `owned_root` is the data store's `deployed/` directory: a target inside
/// it, or a symlink resolving into it, belongs to dodot and may be replaced.
/// Anything else at `target` is a conflict.
#[derive(Debug, Clone)]
pub struct LinkResource {
    /// What the link points at.
    pub source: PathBuf,
    /// Where the link lives.
    pub target: PathBuf,
    owned_root: PathBuf,
    check_source: bool,
}

impl LinkResource {
    /// Create a link resource.
    #[must_use]
    pub fn new(source: PathBuf, target: PathBuf, owned_root: impl Into<PathBuf>) -> Self {
        Self {
            source,
            target,
            owned_root: owned_root.into(),
            check_source: true,
        }
    }

    /// Do not require `source` to exist when checking state.
    ///
    /// Used for the user-visible hop, whose source is an intermediate link
    /// created by the preceding operation.
    #[must_use]
    pub const fn deferred_source(mut self) -> Self {
        self.check_source = false;
        self
    }

    fn owned(&self, path: &Path) -> bool {
        path.starts_with(&self.owned_root)
    }
}

impl Applicable for LinkResource {
    fn description(&self) -> String {
        format!("{} -> {}", self.target.display(), self.source.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        ensure_parent_dir(&self.target)?;
        replace_with_symlink(&self.source, &self.target)?;
        Ok(ResourceChange::Applied)
    }

    /// Remove the link if it still points at `source`.
    fn remove(&self) -> Result<ResourceChange> {
        match std::fs::read_link(&self.target) {
            Ok(dest) if dest == self.source => {
                std::fs::remove_file(&self.target)
                    .with_context(|| format!("remove link: {}", self.target.display()))?;
                Ok(ResourceChange::Applied)
            }
            _ => Ok(ResourceChange::AlreadyCorrect),
        }
    }
}

impl Resource for LinkResource {
    fn current_state(&self) -> Result<ResourceState> {
        if self.check_source && self.source.symlink_metadata().is_err() {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            });
        }

        let Ok(meta) = self.target.symlink_metadata() else {
            return Ok(ResourceState::Missing);
        };

        if meta.is_symlink() {
            let dest = std::fs::read_link(&self.target)
                .with_context(|| format!("reading link: {}", self.target.display()))?;
            if dest == self.source {
                return Ok(ResourceState::Correct);
            }
            if self.owned(&self.target) || self.owned(&dest) {
                return Ok(ResourceState::Incorrect {
                    current: format!("points to {}", dest.display()),
                });
            }
        } else if self.owned(&self.target) {
            return Ok(ResourceState::Incorrect {
                current: describe_existing(&self.target),
            });
        }

        Ok(ResourceState::Conflict {
            existing: describe_existing(&self.target),
        })
    }
}

/// Put a symlink `link -> dest` in place of whatever is at `link`.
///
/// An existing file or symlink is replaced by renaming a freshly created
/// sibling link over it, so `link` is never absent.
fn replace_with_symlink(dest: &Path, link: &Path) -> Result<()> {
    let is_real_dir = link
        .symlink_metadata()
        .is_ok_and(|m| m.is_dir() && !m.is_symlink());
    if is_real_dir {
        remove_existing(link)?;
    }
    if link.symlink_metadata().is_err() {
        return create_symlink(dest, link);
    }

    let name = link
        .file_name()
        .map_or_else(|| "link".to_string(), |n| n.to_string_lossy().to_string());
    let tmp = link.with_file_name(format!(".{name}.dodot-tmp"));
    remove_existing(&tmp)?;
    create_symlink(dest, &tmp)?;
    if let Err(e) = std::fs::rename(&tmp, link) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("replace link: {}", link.display()));
    }
    Ok(())
}

/// Create a symlink at `link` pointing to `dest`.
fn create_symlink(dest: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(dest, link).with_context(|| {
            format!("creating symlink {} -> {}", link.display(), dest.display())
        })
    }
    #[cfg(not(unix))]
    {
        anyhow::bail!(
            "symbolic links are not supported on this platform: {}",
            link.display()
        )
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;

    struct Fixture {
        _dir: tempfile::TempDir,
        deployed: PathBuf,
        home: PathBuf,
        source: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let deployed = dir.path().join("data/deployed");
        let home = dir.path().join("home");
        std::fs::create_dir_all(&deployed).unwrap();
        std::fs::create_dir_all(&home).unwrap();
        let source = dir.path().join("vimrc");
        std::fs::write(&source, "set nu").unwrap();
        Fixture {
            deployed,
            home,
            source,
            _dir: dir,
        }
    }

    #[test]
    fn description_shows_both_ends() {
        let r = LinkResource::new("/src".into(), "/dst".into(), "/data/deployed");
        assert_eq!(r.description(), "/dst -> /src");
    }

    #[test]
    fn invalid_when_source_missing() {
        let f = fixture();
        let r = LinkResource::new(f.home.join("nope"), f.home.join("t"), &f.deployed);
        assert!(matches!(r.current_state().unwrap(), ResourceState::Invalid { .. }));
        let deferred = r.deferred_source();
        assert_eq!(deferred.current_state().unwrap(), ResourceState::Missing);
    }

    #[test]
    fn missing_then_correct_after_apply() {
        let f = fixture();
        let target = f.home.join(".config/vim/vimrc");
        let r = LinkResource::new(f.source.clone(), target.clone(), &f.deployed);
        assert_eq!(r.current_state().unwrap(), ResourceState::Missing);
        assert_eq!(r.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(r.current_state().unwrap(), ResourceState::Correct);
        assert_eq!(std::fs::read_link(&target).unwrap(), f.source);
    }

    #[test]
    fn regular_file_at_user_target_is_conflict() {
        let f = fixture();
        let target = f.home.join(".vimrc");
        std::fs::write(&target, "mine").unwrap();
        let r = LinkResource::new(f.source.clone(), target, &f.deployed);
        assert_eq!(
            r.current_state().unwrap(),
            ResourceState::Conflict {
                existing: "regular file".into()
            }
        );
    }

    #[test]
    fn foreign_symlink_is_conflict() {
        let f = fixture();
        let target = f.home.join(".vimrc");
        symlink("/etc/hosts", &target).unwrap();
        let r = LinkResource::new(f.source.clone(), target, &f.deployed);
        assert!(matches!(r.current_state().unwrap(), ResourceState::Conflict { .. }));
    }

    #[test]
    fn store_owned_symlink_is_replaceable() {
        let f = fixture();
        let other = f.deployed.join("symlink/old/vimrc");
        let target = f.home.join(".vimrc");
        symlink(&other, &target).unwrap();
        let r = LinkResource::new(f.source.clone(), target.clone(), &f.deployed);
        assert!(matches!(r.current_state().unwrap(), ResourceState::Incorrect { .. }));
        r.apply().unwrap();
        assert_eq!(std::fs::read_link(&target).unwrap(), f.source);
    }

    #[test]
    fn entry_inside_store_is_replaceable() {
        let f = fixture();
        let target = f.deployed.join("symlink/vim/vimrc");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, "stale").unwrap();
        let r = LinkResource::new(f.source.clone(), target.clone(), &f.deployed);
        assert!(matches!(r.current_state().unwrap(), ResourceState::Incorrect { .. }));
        r.apply().unwrap();
        assert_eq!(r.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn remove_only_touches_matching_link() {
        let f = fixture();
        let target = f.home.join(".vimrc");
        let r = LinkResource::new(f.source.clone(), target.clone(), &f.deployed);
        r.apply().unwrap();
        assert_eq!(r.remove().unwrap(), ResourceChange::Applied);
        assert!(target.symlink_metadata().is_err());

        std::fs::write(&target, "mine").unwrap();
        assert_eq!(r.remove().unwrap(), ResourceChange::AlreadyCorrect);
        assert!(target.exists());
    }
}
