//! Materialise a [`Plan`]: links, snippets, `PATH` entries and one-shot
//! commands, with dry-run, force and per-file reporting.
//!
//! Operations are processed one pack entry at a time.  The operations of
//! an entry run in order and stop at the first failure, so a user-visible
//! link is never created when its intermediate link could not be.  A
//! failing entry does not stop the run; every entry gets a
//! [`FileEntry`] and the run fails at the end if any entry did.
mod context;
mod processing;
pub mod protect;

pub use context::Context;
pub use processing::{TaskStats, apply_resource, merge, process_single, remove_single};

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::datastore::{DataStore, Sentinel};
use crate::error::DodotError;
use crate::handlers::{HandlerKind, Placement};
use crate::logging::{FileEntry, FileStatus};
use crate::operations::{Operation, OperationKind};
use crate::plan::Plan;
use crate::resources::command::CommandResource;
use crate::resources::file::FileResource;
use crate::resources::link::LinkResource;
use crate::resources::{Resource, ResourceState};

/// User targets written so far in this run, mapped to the entry that wrote
/// them.
type Claims = HashMap<PathBuf, String>;

/// Run every operation in `plan`.
///
/// # Errors
///
/// Returns an error naming the number of failed entries if any entry
/// failed.  Individual failures are logged and recorded, not returned.
pub fn execute(ctx: &Context, plan: &Plan) -> Result<TaskStats> {
    let mut stats = TaskStats::new();
    let mut claims = Claims::new();
    let mut current: Option<HandlerKind> = None;

    for chunk in plan.operations.chunk_by(same_entry) {
        let Some(first) = chunk.first() else {
            continue;
        };
        if current != Some(first.handler) {
            current = Some(first.handler);
            ctx.log.stage(&format!("Handler: {}", first.handler));
        }

        let (status, message) = if ctx.is_interrupted() {
            (FileStatus::Failed, Some(DodotError::Interrupted.to_string()))
        } else {
            match run_entry(ctx, plan, chunk, &mut claims) {
                Ok(outcome) => outcome,
                Err(e) => {
                    ctx.log
                        .error(&format!("{}/{}: {e:#}", first.pack, first.relpath));
                    (FileStatus::Failed, Some(format!("{e:#}")))
                }
            }
        };
        stats.count(status);
        ctx.log.record(FileEntry {
            pack: first.pack.clone(),
            relpath: first.relpath.clone(),
            handler: first.handler,
            status,
            message,
        });
    }

    let stats = stats.finish(ctx);
    if stats.failed > 0 {
        anyhow::bail!("{} operation(s) failed", stats.failed);
    }
    Ok(stats)
}

/// Remove what was deployed for `packs`: user links pointing into the
/// data store first, then each pack's `deployed/` entries.  Sentinels are
/// kept.
///
/// User links are found through the target records written at link time,
/// so a link whose source left the pack, or whose target moved with a
/// config change, is still removed.  Links that `plan` produces but that
/// were never recorded are removed as well.
///
/// # Errors
///
/// Returns an error if any link or data-store entry could not be removed.
pub fn remove(ctx: &Context, plan: &Plan, packs: &[String]) -> Result<TaskStats> {
    let mut stats = TaskStats::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    ctx.log.stage("Removing links");
    let mut unlink_one = |pack: &str, relpath: String, source: &Path, target: &Path| {
        if !seen.insert(target.to_path_buf()) {
            return;
        }
        let entry = unlink(ctx, pack, relpath, source, target);
        stats.count(entry.status);
        ctx.log.record(entry);
    };
    for pack in packs {
        for (intermediate, target) in ctx.store.recorded_targets(pack)? {
            let relpath = intermediate
                .file_name()
                .map_or_else(String::new, |n| n.to_string_lossy().to_string());
            unlink_one(pack, relpath, &intermediate, &target);
        }
    }
    for op in &plan.operations {
        let OperationKind::Link { source, target } = &op.kind else {
            continue;
        };
        if ctx.store.owns(target) || !ctx.store.owns(source) {
            continue;
        }
        unlink_one(&op.pack, op.relpath.clone(), source, target);
    }

    ctx.log.stage("Clearing data store");
    for pack in packs {
        if ctx.dry_run {
            for entry in ctx.store.pack_entries(pack)? {
                ctx.log
                    .dry_run(&format!("would remove {}", entry.display()));
            }
            continue;
        }
        match ctx.store.remove_pack(pack) {
            Ok(removed) => {
                for path in removed {
                    ctx.log.debug(&format!("removed {}", path.display()));
                }
            }
            Err(e) => {
                ctx.log.error(&format!("{pack}: {e:#}"));
                stats.failed += 1;
            }
        }
    }

    let stats = stats.finish(ctx);
    if stats.failed > 0 {
        anyhow::bail!("{} operation(s) failed", stats.failed);
    }
    Ok(stats)
}

/// Remove the user link `target` if it still points at `source`.
fn unlink(ctx: &Context, pack: &str, relpath: String, source: &Path, target: &Path) -> FileEntry {
    let link = LinkResource::new(source.to_path_buf(), target.to_path_buf(), ctx.store.deployed_dir())
        .deferred_source();
    let outcome = link
        .current_state()
        .and_then(|state| remove_single(ctx, &link, &state, "unlink"));
    let (status, message) = match outcome {
        Ok(status) => (status, Some(ctx.paths.display(target))),
        Err(e) => {
            ctx.log.error(&format!("{pack}/{relpath}: {e:#}"));
            (FileStatus::Failed, Some(format!("{e:#}")))
        }
    };
    FileEntry {
        pack: pack.to_string(),
        relpath,
        handler: HandlerKind::Symlink,
        status,
        message,
    }
}

fn same_entry(a: &Operation, b: &Operation) -> bool {
    a.pack == b.pack && a.relpath == b.relpath && a.handler == b.handler
}

/// Run the operations of one pack entry, stopping at the first error.
fn run_entry(
    ctx: &Context,
    plan: &Plan,
    ops: &[Operation],
    claims: &mut Claims,
) -> Result<(FileStatus, Option<String>)> {
    // The pack-side source of the entry, used by the protected-path check.
    let origin = ops.iter().find_map(|op| match &op.kind {
        OperationKind::Link { source, .. }
        | OperationKind::WriteShellSnippet { source, .. }
        | OperationKind::AddToPath { source, .. }
            if !ctx.store.owns(source) =>
        {
            Some(source.clone())
        }
        _ => None,
    });

    let mut status = FileStatus::AlreadyOk;
    let mut message = None;
    for op in ops {
        if ctx.is_interrupted() {
            return Err(DodotError::Interrupted.into());
        }
        let step = match &op.kind {
            OperationKind::Link { source, target } => {
                if ctx.store.owns(target) {
                    link(ctx, source, target)?
                } else {
                    guard_user_target(ctx, plan, op, target, origin.as_deref(), claims)?;
                    message = Some(ctx.paths.display(target));
                    let linked = link(ctx, source, target)?;
                    merge(linked, record_target(ctx, source, target)?)
                }
            }
            OperationKind::AddToPath { source, target } => link(ctx, source, target)?,
            OperationKind::WriteShellSnippet {
                source,
                target,
                placement,
            } => merge(
                link(ctx, source, target)?,
                write_placement(ctx, op, *placement)?,
            ),
            OperationKind::RunCommand {
                program,
                args,
                sentinel,
            } => {
                message = op.command_line();
                run_command(ctx, op, program, args, sentinel)?
            }
            OperationKind::CheckSentinel { sentinel } => {
                if ctx.store.sentinel_matches(sentinel)? {
                    FileStatus::AlreadyOk
                } else {
                    message = Some("not yet run".into());
                    FileStatus::Skipped
                }
            }
        };
        status = merge(status, step);
    }
    Ok((status, message))
}

/// Refuse protected paths always, and targets already written in this run
/// unless forced.
fn guard_user_target(
    ctx: &Context,
    plan: &Plan,
    op: &Operation,
    target: &Path,
    origin: Option<&Path>,
    claims: &mut Claims,
) -> Result<()> {
    let protected = plan
        .config_for(&op.pack)
        .map(|c| protect::expand(&ctx.paths, &c.protected_paths))
        .unwrap_or_default();
    let source = origin.unwrap_or(target);
    if let Some(hit) = protect::violation(target, source, &protected) {
        ctx.log.debug(&format!("protected: {}", hit.display()));
        return Err(DodotError::ProtectedPath {
            target: target.to_path_buf(),
        }
        .into());
    }

    let owner = format!("{}/{}", op.pack, op.relpath);
    if let Some(previous) = claims.get(target)
        && *previous != owner
        && !ctx.force
    {
        return Err(DodotError::Conflict {
            target: target.to_path_buf(),
            existing: format!("also produced by {previous}"),
        }
        .into());
    }
    claims.insert(target.to_path_buf(), owner);
    Ok(())
}

fn link(ctx: &Context, source: &Path, target: &Path) -> Result<FileStatus> {
    let mut resource = LinkResource::new(
        source.to_path_buf(),
        target.to_path_buf(),
        ctx.store.deployed_dir(),
    );
    // The intermediate hop is created by the preceding operation, which a
    // dry run never performs.
    if ctx.store.owns(source) {
        resource = resource.deferred_source();
    }
    let state = resource.current_state()?;
    process_single(ctx, &resource, state, "link")
}

/// Add `target` to the record of user links made to the intermediate
/// `source`, dropping entries that no longer link to it.
fn record_target(ctx: &Context, source: &Path, target: &Path) -> Result<FileStatus> {
    if ctx.dry_run || !ctx.store.owns(source) {
        return Ok(FileStatus::AlreadyOk);
    }
    let mut targets = DataStore::linked_targets(source)?;
    if !targets.iter().any(|t| t == target) {
        targets.push(target.to_path_buf());
    }
    let content: String = targets
        .iter()
        .map(|t| format!("{}\n", t.display()))
        .collect();
    let record = FileResource::new(content, DataStore::target_record(source));
    let state = record.current_state()?;
    // The record is bookkeeping; the entry's status comes from the link.
    process_single(ctx, &record, state, "record").map(|_| FileStatus::AlreadyOk)
}

fn write_placement(ctx: &Context, op: &Operation, placement: Placement) -> Result<FileStatus> {
    let sidecar = FileResource::new(
        placement.as_str(),
        ctx.store.placement_file(&op.pack, &op.relpath),
    );
    let state = sidecar.current_state()?;
    process_single(ctx, &sidecar, state, "write")
}

fn run_command(
    ctx: &Context,
    op: &Operation,
    program: &str,
    args: &[String],
    sentinel: &Sentinel,
) -> Result<FileStatus> {
    if !ctx.force && ctx.store.sentinel_matches(sentinel)? {
        ctx.log
            .info(&format!("already completed: {}/{}", op.pack, op.relpath));
        return Ok(FileStatus::AlreadyOk);
    }
    let root = &ctx.paths.dotfiles_root;
    let command = CommandResource::new(
        program.to_string(),
        args.to_vec(),
        root.join(&op.pack),
        sentinel.clone(),
        ctx.store.clone(),
        ctx.executor.clone(),
    )
    .with_env(vec![
        ("DOTFILES_ROOT".into(), root.display().to_string()),
        ("DODOT_DATA_DIR".into(), ctx.store.root().display().to_string()),
        ("DODOT_PACK".into(), op.pack.clone()),
    ])
    .with_interrupt(ctx.interrupted.clone());

    if ctx.dry_run {
        ctx.log.dry_run(&format!(
            "would run {} ({})",
            sentinel.basename,
            command.command_line()
        ));
        return Ok(FileStatus::DryRun);
    }
    ctx.log.info(&format!("running {}/{}", op.pack, op.relpath));
    let state = if ctx.force {
        ResourceState::Missing
    } else {
        command.current_state()?
    };
    process_single(ctx, &command, state, "ran")
}
