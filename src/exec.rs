//! Child-process execution behind the [`Executor`] trait.
use anyhow::{Context, Result};
use std::fmt::Debug;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

/// Exit of a command that ran attached to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    /// Whether the command exited zero.
    pub success: bool,
    /// Exit code; `None` when the child was killed by a signal.
    pub code: Option<i32>,
}

impl From<ExitStatus> for ExecResult {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

/// Runs external programs.
///
/// The executor stage talks to this trait so tests can substitute a mock and
/// never spawn processes.
pub trait Executor: Send + Sync + Debug {
    /// Run `program` in `dir` with the terminal's stdio and `env` added to
    /// its environment, returning its exit even when non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error only if the program cannot be spawned.
    fn run_attached(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult>;
}

/// [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_attached(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        for (k, v) in env {
            cmd.env(k, v);
        }
        let status = cmd
            .status()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult::from(status))
    }
}
