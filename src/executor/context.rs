//! Shared state for materialising a plan.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::datastore::DataStore;
use crate::exec::Executor;
use crate::filesystem::{FileSystemOps, SystemFileSystemOps};
use crate::logging::Log;
use crate::paths::Paths;

/// Shared context for materialising a plan.
pub struct Context {
    /// Resolved locations.
    pub paths: Arc<Paths>,
    /// Data store rooted at `paths.data_dir`.
    pub store: DataStore,
    /// Logger for output and file recording.
    pub log: Arc<dyn Log>,
    /// Whether to perform a dry run (preview changes without applying).
    pub dry_run: bool,
    /// Re-run one-shot commands and let later entries take over targets
    /// claimed earlier in the run.
    pub force: bool,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Filesystem operation abstraction (injectable for testing).
    pub fs_ops: Arc<dyn FileSystemOps>,
    /// Set by the SIGINT handler.
    pub interrupted: Arc<AtomicBool>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("paths", &self.paths)
            .field("store", &self.store)
            .field("log", &"<dyn Log>")
            .field("dry_run", &self.dry_run)
            .field("force", &self.force)
            .field("executor", &"<dyn Executor>")
            .field("fs_ops", &"<dyn FileSystemOps>")
            .field("interrupted", &self.interrupted)
            .finish()
    }
}

impl Context {
    /// Creates a new context for plan execution.
    #[must_use]
    pub fn new(
        paths: Arc<Paths>,
        log: Arc<dyn Log>,
        dry_run: bool,
        force: bool,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            store: DataStore::new(&paths.data_dir),
            paths,
            log,
            dry_run,
            force,
            executor,
            fs_ops: Arc::new(SystemFileSystemOps),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a SIGINT has been received.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Create a copy of this context with a different logger.
    #[must_use]
    pub fn with_log(&self, log: Arc<dyn Log>) -> Self {
        Self {
            paths: Arc::clone(&self.paths),
            store: self.store.clone(),
            log,
            dry_run: self.dry_run,
            force: self.force,
            executor: Arc::clone(&self.executor),
            fs_ops: Arc::clone(&self.fs_ops),
            interrupted: Arc::clone(&self.interrupted),
        }
    }

    /// Create a copy of this context with a different [`FileSystemOps`] implementation.
    #[cfg(test)]
    #[must_use]
    pub fn with_fs_ops(&self, fs_ops: Arc<dyn FileSystemOps>) -> Self {
        Self {
            fs_ops,
            ..self.with_log(Arc::clone(&self.log))
        }
    }
}
