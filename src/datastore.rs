//! On-disk data store layout, sentinels, ownership, and the advisory lock.
//!
//! ```text
//! shell/<script>                        loader scripts
//! deployed/symlink/<pack>/<basename>    intermediate link → source file
//! deployed/symlink/<pack>/.<basename>.target
//! deployed/shell/<pack>/<basename>      snippet intermediate link
//! deployed/shell/<pack>/.<basename>.placement
//! deployed/path/<pack>-<dir>            directory intermediate link
//! install/sentinels/<pack>/<token>      install-script sentinels
//! brewfile/<pack>/<token>               Brewfile sentinels
//! .lock                                 advisory lock
//! ```
//!
//! The shell loader depends on this layout.
use anyhow::{Context as _, Result};
use fs4::FileExt;
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::UserInputError;
use crate::handlers::HandlerKind;

const DEPLOYED_DIR: &str = "deployed";
const SHELL_DIR: &str = "shell";
const LOCK_FILE: &str = ".lock";

/// Identity of a one-shot execution record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel {
    /// Owning pack.
    pub pack: String,
    /// `Install` or `Homebrew`.
    pub handler: HandlerKind,
    /// Script basename (e.g. `install.sh`).
    pub basename: String,
    /// Hex SHA-256 of the script content.
    pub hash: String,
}

impl Sentinel {
    /// File name of the sentinel: `<basename>-<sha256>`.
    #[must_use]
    pub fn token(&self) -> String {
        format!("{}-{}", self.basename, self.hash)
    }
}

/// Contents of a sentinel file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelRecord {
    /// Content hash recorded at completion.
    pub hash: String,
    /// UTC completion time, when recorded.
    pub completed_at: Option<String>,
}

/// Handle on the data store directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStore {
    root: PathBuf,
}

impl DataStore {
    /// A data store rooted at `root`. Nothing is created until written.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The data store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `deployed/`, the only directory user-visible links may point into.
    #[must_use]
    pub fn deployed_dir(&self) -> PathBuf {
        self.root.join(DEPLOYED_DIR)
    }

    /// `shell/`, where loader scripts are installed.
    #[must_use]
    pub fn shell_dir(&self) -> PathBuf {
        self.root.join(SHELL_DIR)
    }

    /// Intermediate link for a symlinked file.
    #[must_use]
    pub fn symlink_entry(&self, pack: &str, basename: &str) -> PathBuf {
        self.deployed_dir().join("symlink").join(pack).join(basename)
    }

    /// Intermediate link for a shell snippet.
    #[must_use]
    pub fn shell_entry(&self, pack: &str, basename: &str) -> PathBuf {
        self.deployed_dir().join("shell").join(pack).join(basename)
    }

    /// Placement sidecar for a shell snippet.
    #[must_use]
    pub fn placement_file(&self, pack: &str, basename: &str) -> PathBuf {
        self.deployed_dir()
            .join("shell")
            .join(pack)
            .join(format!(".{basename}.placement"))
    }

    /// Sidecar listing the user-visible links made to `intermediate`, one
    /// path per line.
    #[must_use]
    pub fn target_record(intermediate: &Path) -> PathBuf {
        let name = intermediate
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().to_string());
        intermediate.with_file_name(format!(".{name}.target"))
    }

    /// Recorded user targets of `intermediate` that are still links to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read.
    pub fn linked_targets(intermediate: &Path) -> Result<Vec<PathBuf>> {
        let record = Self::target_record(intermediate);
        let text = match std::fs::read_to_string(&record) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", record.display())),
        };
        Ok(text
            .lines()
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .filter(|t| std::fs::read_link(t).is_ok_and(|dest| dest == intermediate))
            .collect())
    }

    /// Every symlink entry of `pack` paired with each user target still
    /// linked to it, in entry order.
    ///
    /// # Errors
    ///
    /// Returns an error if the pack directory or a target record cannot be
    /// read.
    pub fn recorded_targets(&self, pack: &str) -> Result<Vec<(PathBuf, PathBuf)>> {
        let mut pairs = Vec::new();
        for entry in list_dir(&self.deployed_dir().join("symlink").join(pack))? {
            if is_hidden(&entry) {
                continue;
            }
            for target in Self::linked_targets(&entry)? {
                pairs.push((entry.clone(), target));
            }
        }
        Ok(pairs)
    }

    /// Intermediate link for a PATH directory.
    #[must_use]
    pub fn path_entry(&self, pack: &str, dir: &str) -> PathBuf {
        self.deployed_dir()
            .join("path")
            .join(format!("{pack}-{}", dir.replace('/', "-")))
    }

    /// Directory holding a pack's sentinels for `handler`.
    #[must_use]
    pub fn sentinel_dir(&self, pack: &str, handler: HandlerKind) -> PathBuf {
        let base = handler.sentinel_dir().unwrap_or("sentinels");
        self.root.join(base).join(pack)
    }

    /// Full path of a sentinel file.
    #[must_use]
    pub fn sentinel_path(&self, sentinel: &Sentinel) -> PathBuf {
        self.sentinel_dir(&sentinel.pack, sentinel.handler)
            .join(sentinel.token())
    }

    /// Whether `path` lies inside `deployed/`.
    #[must_use]
    pub fn owns(&self, path: &Path) -> bool {
        path.starts_with(self.deployed_dir())
    }

    /// Whether `link` is a symlink whose first hop lands inside `deployed/`.
    #[must_use]
    pub fn owns_link(&self, link: &Path) -> bool {
        std::fs::read_link(link).is_ok_and(|dest| self.owns(&dest))
    }

    /// Read a sentinel, or `None` if it has not been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the sentinel exists but cannot be read.
    pub fn read_sentinel(&self, sentinel: &Sentinel) -> Result<Option<SentinelRecord>> {
        let path = self.sentinel_path(sentinel);
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let mut lines = text.lines();
                let hash = lines.next().unwrap_or_default().trim().to_string();
                let completed_at = lines
                    .next()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from);
                Ok(Some(SentinelRecord { hash, completed_at }))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading sentinel {}", path.display())),
        }
    }

    /// Whether a sentinel exists and records the expected hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the sentinel exists but cannot be read.
    pub fn sentinel_matches(&self, sentinel: &Sentinel) -> Result<bool> {
        Ok(self
            .read_sentinel(sentinel)?
            .is_some_and(|r| r.hash == sentinel.hash))
    }

    /// Record a completed one-shot run, removing older sentinels for the
    /// same script.
    ///
    /// # Errors
    ///
    /// Returns an error if the sentinel directory or file cannot be written.
    pub fn write_sentinel(&self, sentinel: &Sentinel) -> Result<PathBuf> {
        let dir = self.sentinel_dir(&sentinel.pack, sentinel.handler);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create sentinel dir: {}", dir.display()))?;
        let path = dir.join(sentinel.token());
        let stamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        std::fs::write(&path, format!("{}\n{stamp}\n", sentinel.hash))
            .with_context(|| format!("write sentinel: {}", path.display()))?;

        let prefix = format!("{}-", sentinel.basename);
        let token = sentinel.token();
        for entry in std::fs::read_dir(&dir)
            .with_context(|| format!("reading sentinel dir: {}", dir.display()))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name != token && name.starts_with(&prefix) {
                std::fs::remove_file(entry.path())
                    .with_context(|| format!("remove stale sentinel: {name}"))?;
            }
        }
        Ok(path)
    }

    /// The sentinel token currently recorded for a script, regardless of hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the sentinel directory exists but cannot be read.
    pub fn recorded_sentinel_for(
        &self,
        pack: &str,
        handler: HandlerKind,
        basename: &str,
    ) -> Result<Option<String>> {
        let dir = self.sentinel_dir(pack, handler);
        let read = match std::fs::read_dir(&dir) {
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", dir.display())),
        };
        let prefix = format!("{basename}-");
        let mut names: Vec<String> = read
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with(&prefix))
            .collect();
        names.sort();
        Ok(names.pop())
    }

    /// Existing data-store entries that belong to `pack`.
    ///
    /// # Errors
    ///
    /// Returns an error if a data-store directory cannot be read.
    pub fn pack_entries(&self, pack: &str) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for kind in ["symlink", "shell"] {
            let dir = self.deployed_dir().join(kind).join(pack);
            entries.extend(list_dir(&dir)?);
        }
        let prefix = format!("{pack}-");
        entries.extend(
            list_dir(&self.deployed_dir().join("path"))?
                .into_iter()
                .filter(|p| {
                    p.file_name()
                        .is_some_and(|n| n.to_string_lossy().starts_with(&prefix))
                }),
        );
        Ok(entries)
    }

    /// Names of every pack with entries under `deployed/`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if a data-store directory cannot be read.
    pub fn deployed_packs(&self) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for kind in ["symlink", "shell"] {
            for dir in list_dir(&self.deployed_dir().join(kind))? {
                if let Some(name) = dir.file_name() {
                    names.insert(name.to_string_lossy().to_string());
                }
            }
        }
        // `path/<pack>-<dir>` links to `<root>/<pack>/<dir>`.
        for entry in list_dir(&self.deployed_dir().join("path"))? {
            let Ok(dest) = std::fs::read_link(&entry) else {
                continue;
            };
            let Some(pack) = dest.parent().and_then(Path::file_name) else {
                continue;
            };
            let pack = pack.to_string_lossy().to_string();
            if entry
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with(&format!("{pack}-")))
            {
                names.insert(pack);
            }
        }
        Ok(names.into_iter().collect())
    }

    /// Whether `pack` has any entry under `deployed/`.
    ///
    /// # Errors
    ///
    /// Returns an error if a data-store directory cannot be read.
    pub fn has_pack(&self, pack: &str) -> Result<bool> {
        Ok(!self.pack_entries(pack)?.is_empty())
    }

    /// Remove every `deployed/` subtree belonging to `pack`.
    ///
    /// Sentinels are kept so one-shot handlers do not re-run.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry cannot be removed.
    pub fn remove_pack(&self, pack: &str) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for kind in ["symlink", "shell"] {
            let dir = self.deployed_dir().join(kind).join(pack);
            if dir.symlink_metadata().is_ok() {
                std::fs::remove_dir_all(&dir)
                    .with_context(|| format!("remove {}", dir.display()))?;
                removed.push(dir);
            }
        }
        let prefix = format!("{pack}-");
        for entry in list_dir(&self.deployed_dir().join("path"))? {
            if entry
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with(&prefix))
            {
                std::fs::remove_file(&entry)
                    .with_context(|| format!("remove {}", entry.display()))?;
                removed.push(entry);
            }
        }
        Ok(removed)
    }

    /// Take the advisory lock on `.lock`, failing fast if it is held.
    ///
    /// The lock is released when the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`UserInputError::Locked`] when another process holds the
    /// lock, or an I/O error if the lock file cannot be opened.
    pub fn lock(&self) -> Result<StoreLock> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("create data dir: {}", self.root.display()))?;
        let path = self.root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("failed to open lock {}", path.display()))?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(StoreLock { _file: file, path }),
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                Err(UserInputError::Locked(path).into())
            }
            Err(err) => Err(err).with_context(|| format!("failed to lock {}", path.display())),
        }
    }
}

/// Guard for the data-store advisory lock.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

/// Sorted entries of `dir`, or nothing if it does not exist.
fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let read = match std::fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("reading {}", dir.display())),
    };
    let mut entries = read
        .map(|e| e.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("reading {}", dir.display()))?;
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn sentinel(hash: &str) -> Sentinel {
        Sentinel {
            pack: "dev".into(),
            handler: HandlerKind::Install,
            basename: "install.sh".into(),
            hash: hash.into(),
        }
    }

    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    #[test]
    fn layout_paths() {
        let store = DataStore::new("/data");
        assert_eq!(
            store.symlink_entry("vim", "vimrc"),
            PathBuf::from("/data/deployed/symlink/vim/vimrc")
        );
        assert_eq!(
            store.shell_entry("shell", "aliases.sh"),
            PathBuf::from("/data/deployed/shell/shell/aliases.sh")
        );
        assert_eq!(
            store.placement_file("shell", "aliases.sh"),
            PathBuf::from("/data/deployed/shell/shell/.aliases.sh.placement")
        );
        assert_eq!(
            store.path_entry("tools", "bin"),
            PathBuf::from("/data/deployed/path/tools-bin")
        );
        assert_eq!(
            store.sentinel_path(&sentinel("abc")),
            PathBuf::from("/data/install/sentinels/dev/install.sh-abc")
        );
        let brew = Sentinel {
            handler: HandlerKind::Homebrew,
            basename: "Brewfile".into(),
            ..sentinel("abc")
        };
        assert_eq!(
            store.sentinel_path(&brew),
            PathBuf::from("/data/brewfile/dev/Brewfile-abc")
        );
    }

    #[test]
    fn owns_is_limited_to_deployed() {
        let store = DataStore::new("/data");
        assert!(store.owns(Path::new("/data/deployed/symlink/vim/vimrc")));
        assert!(!store.owns(Path::new("/data/shell/dodot-init.sh")));
        assert!(!store.owns(Path::new("/dots/vim/vimrc")));
    }

    // -----------------------------------------------------------------------
    // Sentinels
    // -----------------------------------------------------------------------

    #[test]
    fn sentinel_missing_then_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let s = sentinel("abc");
        assert!(store.read_sentinel(&s).unwrap().is_none());
        assert!(!store.sentinel_matches(&s).unwrap());

        store.write_sentinel(&s).unwrap();
        let record = store.read_sentinel(&s).unwrap().unwrap();
        assert_eq!(record.hash, "abc");
        assert!(record.completed_at.is_some());
        assert!(store.sentinel_matches(&s).unwrap());
    }

    #[test]
    fn writing_new_sentinel_prunes_old_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        store.write_sentinel(&sentinel("old")).unwrap();
        store.write_sentinel(&sentinel("new")).unwrap();
        assert!(!store.sentinel_path(&sentinel("old")).exists());
        assert!(store.sentinel_path(&sentinel("new")).exists());
        assert_eq!(
            store
                .recorded_sentinel_for("dev", HandlerKind::Install, "install.sh")
                .unwrap()
                .as_deref(),
            Some("install.sh-new")
        );
    }

    // -----------------------------------------------------------------------
    // Pack removal
    // -----------------------------------------------------------------------

    #[cfg(unix)]
    #[test]
    fn remove_pack_keeps_sentinels_and_other_packs() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let vim = store.symlink_entry("vim", "vimrc");
        let tools = store.path_entry("tools", "bin");
        let toolsmith = store.path_entry("toolsmith", "bin");
        for p in [&vim, &tools, &toolsmith] {
            std::fs::create_dir_all(p.parent().unwrap()).unwrap();
            std::os::unix::fs::symlink("/nowhere", p).unwrap();
        }
        store
            .write_sentinel(&Sentinel {
                pack: "tools".into(),
                ..sentinel("abc")
            })
            .unwrap();

        let entries = store.pack_entries("tools").unwrap();
        assert_eq!(entries, vec![tools.clone()]);

        store.remove_pack("tools").unwrap();
        assert!(tools.symlink_metadata().is_err());
        assert!(toolsmith.symlink_metadata().is_ok());
        assert!(vim.symlink_metadata().is_ok());
        assert!(dir.path().join("install/sentinels/tools").exists());
    }

    #[cfg(unix)]
    #[test]
    fn recorded_targets_skip_links_that_moved_away() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path().join("data"));
        let home = dir.path().join("home");
        std::fs::create_dir_all(&home).unwrap();
        let vimrc = store.symlink_entry("vim", "vimrc");
        std::fs::create_dir_all(vimrc.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink("/dots/vim/vimrc", &vimrc).unwrap();

        let kept = home.join(".vimrc");
        let replaced = home.join(".vim/vimrc");
        std::os::unix::fs::symlink(&vimrc, &kept).unwrap();
        std::fs::write(
            DataStore::target_record(&vimrc),
            format!("{}\n{}\n", kept.display(), replaced.display()),
        )
        .unwrap();

        assert_eq!(
            DataStore::target_record(&vimrc),
            dir.path().join("data/deployed/symlink/vim/.vimrc.target")
        );
        assert_eq!(store.recorded_targets("vim").unwrap(), vec![(vimrc, kept)]);
        assert!(store.recorded_targets("git").unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn deployed_packs_reads_every_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let vim = store.symlink_entry("vim", "vimrc");
        let shell = store.shell_entry("zsh", "aliases.sh");
        let tools = store.path_entry("my-tools", "bin");
        for p in [&vim, &shell, &tools] {
            std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        }
        std::os::unix::fs::symlink("/dots/vim/vimrc", &vim).unwrap();
        std::os::unix::fs::symlink("/dots/zsh/aliases.sh", &shell).unwrap();
        std::os::unix::fs::symlink("/dots/my-tools/bin", &tools).unwrap();

        assert_eq!(
            store.deployed_packs().unwrap(),
            vec!["my-tools".to_string(), "vim".into(), "zsh".into()]
        );
        assert!(store.has_pack("my-tools").unwrap());
        assert!(!store.has_pack("git").unwrap());
    }

    // -----------------------------------------------------------------------
    // Lock
    // -----------------------------------------------------------------------

    #[test]
    fn second_lock_is_refused_until_first_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let first = store.lock().unwrap();
        assert!(first.path().ends_with(".lock"));
        let err = store.lock().unwrap_err();
        assert!(err.downcast_ref::<UserInputError>().is_some());
        drop(first);
        assert!(store.lock().is_ok());
    }
}
