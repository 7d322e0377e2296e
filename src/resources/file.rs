//! File resource: a file whose content must match a fixed string.
//!
//! Used for the embedded shell loaders and for the placement and target
//! sidecars.
use anyhow::{Context as _, Result};
use std::path::PathBuf;

use super::helpers::fs::{ensure_parent_dir, remove_existing};
use super::{Applicable, Resource, ResourceChange, ResourceState};

/// A file at `target` holding exactly `content`.
#[derive(Debug, Clone)]
pub struct FileResource {
    /// Expected content.
    pub content: String,
    /// Installed location.
    pub target: PathBuf,
}

impl FileResource {
    /// Create a file resource.
    #[must_use]
    pub fn new(content: impl Into<String>, target: PathBuf) -> Self {
        Self {
            content: content.into(),
            target,
        }
    }
}

impl Applicable for FileResource {
    fn description(&self) -> String {
        self.target.file_name().map_or_else(
            || self.target.display().to_string(),
            |n| n.to_string_lossy().to_string(),
        )
    }

    fn apply(&self) -> Result<ResourceChange> {
        ensure_parent_dir(&self.target)?;
        remove_existing(&self.target)?;
        std::fs::write(&self.target, &self.content)
            .with_context(|| format!("write file: {}", self.target.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.target, std::fs::Permissions::from_mode(0o644))
                .with_context(|| format!("setting permissions: {}", self.target.display()))?;
        }

        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        if self.target.exists() {
            std::fs::remove_file(&self.target)
                .with_context(|| format!("remove file: {}", self.target.display()))?;
            Ok(ResourceChange::Applied)
        } else {
            Ok(ResourceChange::AlreadyCorrect)
        }
    }
}

impl Resource for FileResource {
    fn current_state(&self) -> Result<ResourceState> {
        // Detect broken symlinks at the target location
        if !self.target.exists() && self.target.symlink_metadata().is_ok() {
            return Ok(ResourceState::Incorrect {
                current: "broken symlink".to_string(),
            });
        }

        if !self.target.exists() {
            return Ok(ResourceState::Missing);
        }

        let current = std::fs::read(&self.target)
            .with_context(|| format!("read file: {}", self.target.display()))?;
        if current == self.content.as_bytes() {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: "content differs".to_string(),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn description_returns_filename() {
        let r = FileResource::new("", PathBuf::from("/data/shell/dodot-init.sh"));
        assert_eq!(r.description(), "dodot-init.sh");
    }

    #[test]
    fn install_then_detect_drift() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("shell/dodot-init.sh");
        let r = FileResource::new("echo loaded\n", target.clone());
        assert_eq!(r.current_state().unwrap(), ResourceState::Missing);

        r.apply().unwrap();
        assert_eq!(r.current_state().unwrap(), ResourceState::Correct);

        std::fs::write(&target, "edited").unwrap();
        assert_eq!(
            r.current_state().unwrap(),
            ResourceState::Incorrect {
                current: "content differs".into()
            }
        );
        r.apply().unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "echo loaded\n");
    }

    #[test]
    fn remove_deletes_installed_file() {
        let dir = tempfile::tempdir().unwrap();
        let r = FileResource::new("x", dir.path().join("dodot-init.fish"));
        r.apply().unwrap();
        assert_eq!(r.remove().unwrap(), ResourceChange::Applied);
        assert_eq!(r.remove().unwrap(), ResourceChange::AlreadyCorrect);
    }
}
