//! Sentinel-guarded command resource.
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::datastore::{DataStore, Sentinel};
use crate::error::DodotError;
use crate::exec::Executor;

/// A command that runs once per [`Sentinel`].
///
/// The command inherits the terminal and runs in `dir` with `env` added to
/// its environment.  The sentinel is written only after a zero exit that was
/// not interrupted.
pub struct CommandResource {
    /// Executable.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Working directory (the pack directory).
    pub dir: PathBuf,
    /// Extra environment variables.
    pub env: Vec<(String, String)>,
    /// Guarding sentinel.
    pub sentinel: Sentinel,
    store: DataStore,
    executor: Arc<dyn Executor>,
    interrupted: Arc<AtomicBool>,
}

impl std::fmt::Debug for CommandResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandResource")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("dir", &self.dir)
            .field("sentinel", &self.sentinel)
            .field("executor", &"<dyn Executor>")
            .finish_non_exhaustive()
    }
}

impl CommandResource {
    /// Create a command resource.
    #[must_use]
    pub fn new(
        program: String,
        args: Vec<String>,
        dir: PathBuf,
        sentinel: Sentinel,
        store: DataStore,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            program,
            args,
            dir,
            env: Vec::new(),
            sentinel,
            store,
            executor,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Add environment variables for the child.
    #[must_use]
    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    /// Share an interrupt flag; a set flag after the child exits suppresses
    /// the sentinel.
    #[must_use]
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = interrupted;
        self
    }

    /// Space-joined command line.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Applicable for CommandResource {
    fn description(&self) -> String {
        self.command_line()
    }

    fn apply(&self) -> Result<ResourceChange> {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        let env: Vec<(&str, &str)> = self
            .env
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let result = self
            .executor
            .run_attached(&self.dir, &self.program, &args, &env)?;
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(DodotError::Interrupted.into());
        }
        if !result.success {
            return Err(DodotError::CommandFailed {
                command: self.command_line(),
                code: result.code,
            }
            .into());
        }
        self.store.write_sentinel(&self.sentinel)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for CommandResource {
    fn current_state(&self) -> Result<ResourceState> {
        if self.store.sentinel_matches(&self.sentinel)? {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::handlers::HandlerKind;
    use crate::resources::test_helpers::MockExecutor;

    fn sentinel() -> Sentinel {
        Sentinel {
            pack: "dev".into(),
            handler: HandlerKind::Install,
            basename: "install.sh".into(),
            hash: "abc123".into(),
        }
    }

    fn resource(store: &DataStore, executor: Arc<MockExecutor>) -> CommandResource {
        CommandResource::new(
            "bash".into(),
            vec!["/dots/dev/install.sh".into()],
            PathBuf::from("/dots/dev"),
            sentinel(),
            store.clone(),
            executor,
        )
    }

    #[test]
    fn success_writes_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let executor = Arc::new(MockExecutor::ok());
        let r = resource(&store, Arc::clone(&executor));
        assert_eq!(r.current_state().unwrap(), ResourceState::Missing);
        assert_eq!(r.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(r.current_state().unwrap(), ResourceState::Correct);
        assert_eq!(executor.calls(), vec!["bash /dots/dev/install.sh"]);
    }

    #[test]
    fn failure_reports_exit_code_and_leaves_no_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let r = resource(&store, Arc::new(MockExecutor::fail()));
        let err = r.apply().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DodotError>(),
            Some(DodotError::CommandFailed { code: Some(1), .. })
        ));
        assert_eq!(r.current_state().unwrap(), ResourceState::Missing);
    }

    #[test]
    fn interrupt_suppresses_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let flag = Arc::new(AtomicBool::new(true));
        let r = resource(&store, Arc::new(MockExecutor::ok())).with_interrupt(flag);
        let err = r.apply().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DodotError>(),
            Some(DodotError::Interrupted)
        ));
        assert!(!store.sentinel_matches(&sentinel()).unwrap());
    }

    #[test]
    fn description_is_command_line() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path());
        let r = resource(&store, Arc::new(MockExecutor::ok()));
        assert_eq!(r.description(), "bash /dots/dev/install.sh");
    }
}
