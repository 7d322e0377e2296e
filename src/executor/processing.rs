//! Generic resource processing: check state, apply or report, collect stats.
use anyhow::Result;

use super::context::Context;
use crate::error::DodotError;
use crate::logging::FileStatus;
use crate::resources::{Resource, ResourceChange, ResourceState};

/// Counters for a run.
///
/// # Examples
///
/// ```
/// use dodot::executor::TaskStats;
///
/// let mut stats = TaskStats::new();
/// stats.changed = 3;
/// stats.already_ok = 10;
///
/// assert_eq!(stats.summary(false), "3 changed, 10 already ok");
/// assert_eq!(stats.summary(true), "3 would change, 10 already ok");
/// ```
///
/// Skipped and failed counts appear only when non-zero:
///
/// ```
/// use dodot::executor::TaskStats;
///
/// let stats = TaskStats { changed: 1, already_ok: 2, skipped: 3, failed: 1 };
/// assert_eq!(stats.summary(false), "1 changed, 2 already ok, 3 skipped, 1 failed");
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    /// Number of items changed or applied.
    pub changed: u32,
    /// Number of items already in the correct state.
    pub already_ok: u32,
    /// Number of items deliberately not processed.
    pub skipped: u32,
    /// Number of items that failed.
    pub failed: u32,
}

impl TaskStats {
    /// Create a new empty stats counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Format the summary string (e.g. "3 changed, 10 already ok, 1 skipped").
    #[must_use]
    pub fn summary(&self, dry_run: bool) -> String {
        let verb = if dry_run { "would change" } else { "changed" };
        let mut out = format!("{} {verb}, {} already ok", self.changed, self.already_ok);
        if self.skipped > 0 {
            out.push_str(&format!(", {} skipped", self.skipped));
        }
        if self.failed > 0 {
            out.push_str(&format!(", {} failed", self.failed));
        }
        out
    }

    /// Count one file outcome.
    pub const fn count(&mut self, status: FileStatus) {
        match status {
            FileStatus::Changed | FileStatus::DryRun => self.changed += 1,
            FileStatus::AlreadyOk => self.already_ok += 1,
            FileStatus::Skipped => self.skipped += 1,
            FileStatus::Failed => self.failed += 1,
        }
    }

    /// Log the summary line.
    pub fn finish(self, ctx: &Context) -> Self {
        ctx.log.info(&self.summary(ctx.dry_run));
        self
    }
}

impl std::ops::AddAssign for TaskStats {
    fn add_assign(&mut self, other: Self) {
        self.changed += other.changed;
        self.already_ok += other.already_ok;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Combine the outcomes of the operations behind one file.
///
/// Any change dominates "already ok"; a dry-run report dominates both.
#[must_use]
pub const fn merge(a: FileStatus, b: FileStatus) -> FileStatus {
    match (a, b) {
        (FileStatus::Failed, _) | (_, FileStatus::Failed) => FileStatus::Failed,
        (FileStatus::DryRun, _) | (_, FileStatus::DryRun) => FileStatus::DryRun,
        (FileStatus::Changed, _) | (_, FileStatus::Changed) => FileStatus::Changed,
        (FileStatus::Skipped, _) | (_, FileStatus::Skipped) => FileStatus::Skipped,
        (FileStatus::AlreadyOk, FileStatus::AlreadyOk) => FileStatus::AlreadyOk,
    }
}

/// Process a single resource given its current state.
///
/// `Conflict` and `Invalid` states are errors; in a dry run they are also
/// reported as "would conflict" / "would fail" lines first.
///
/// # Errors
///
/// Returns [`DodotError::Conflict`] for a conflicting target, an error for
/// an invalid resource, or whatever `apply()` returns.
pub fn process_single<R: Resource>(
    ctx: &Context,
    resource: &R,
    state: ResourceState,
    verb: &str,
) -> Result<FileStatus> {
    let desc = resource.description();
    match state {
        ResourceState::Correct => {
            ctx.log.debug(&format!("ok: {desc}"));
            Ok(FileStatus::AlreadyOk)
        }
        ResourceState::Conflict { existing } => {
            if ctx.dry_run {
                ctx.log.dry_run(&format!("would conflict: {desc} ({existing})"));
            }
            Err(DodotError::Conflict {
                target: conflict_target(&desc),
                existing,
            }
            .into())
        }
        ResourceState::Invalid { reason } => {
            if ctx.dry_run {
                ctx.log.dry_run(&format!("would fail: {desc} ({reason})"));
            }
            anyhow::bail!("{reason}")
        }
        state @ (ResourceState::Missing | ResourceState::Incorrect { .. }) => {
            if ctx.dry_run {
                let msg = if let ResourceState::Incorrect { ref current } = state {
                    format!("would {verb} {desc} (currently {current})")
                } else {
                    format!("would {verb} {desc}")
                };
                ctx.log.dry_run(&msg);
                return Ok(FileStatus::DryRun);
            }
            apply_resource(ctx, resource, verb)
        }
    }
}

/// Apply a single resource change.
///
/// # Errors
///
/// Returns whatever error `apply()` returns.
pub fn apply_resource<R: Resource>(ctx: &Context, resource: &R, verb: &str) -> Result<FileStatus> {
    let desc = resource.description();
    match resource.apply()? {
        ResourceChange::Applied => {
            ctx.log.debug(&format!("{verb}: {desc}"));
            Ok(FileStatus::Changed)
        }
        ResourceChange::AlreadyCorrect => Ok(FileStatus::AlreadyOk),
        ResourceChange::Skipped { reason } => {
            ctx.log.debug(&format!("skipped {desc}: {reason}"));
            Ok(FileStatus::Skipped)
        }
    }
}

/// Remove a resource that is in the [`ResourceState::Correct`] state.
///
/// Anything else is not ours, or already gone, and is left alone.
///
/// # Errors
///
/// Returns an error if removal fails.
pub fn remove_single<R: Resource>(
    ctx: &Context,
    resource: &R,
    state: &ResourceState,
    verb: &str,
) -> Result<FileStatus> {
    let desc = resource.description();
    if *state != ResourceState::Correct {
        return Ok(FileStatus::AlreadyOk);
    }
    if ctx.dry_run {
        ctx.log.dry_run(&format!("would {verb} {desc}"));
        return Ok(FileStatus::DryRun);
    }
    resource.remove()?;
    ctx.log.debug(&format!("{verb}: {desc}"));
    Ok(FileStatus::Changed)
}

/// The target half of a `"<target> -> <source>"` description.
fn conflict_target(desc: &str) -> std::path::PathBuf {
    desc.split(" -> ").next().unwrap_or(desc).into()
}
