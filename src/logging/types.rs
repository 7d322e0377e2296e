//! Core logging types: per-file records, their status, and the [`Log`] trait.
use serde::Serialize;

use crate::handlers::HandlerKind;

/// Outcome of one operation, for the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Owning pack.
    pub pack: String,
    /// Entry path relative to the pack.
    pub relpath: String,
    /// Handler that processed the entry.
    pub handler: HandlerKind,
    /// Final status.
    pub status: FileStatus,
    /// Detail (target path, skip reason, or error description).
    pub message: Option<String>,
}

/// Status of a processed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Something was created, replaced, run, or removed.
    Changed,
    /// Already in the desired state.
    AlreadyOk,
    /// Deliberately not processed.
    Skipped,
    /// Dry run; the change was only reported.
    DryRun,
    /// The operation failed.
    Failed,
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) is the only production implementation;
/// tests may provide their own to capture output.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a file result for the summary.
    fn record(&self, entry: FileEntry);
}
