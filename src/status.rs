//! Read-only per-file status: what `on` would find for each pack entry.
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::datastore::{DataStore, Sentinel};
use crate::executor::protect;
use crate::handlers::{HandlerKind, Placement};
use crate::operations::{Operation, OperationKind};
use crate::paths::Paths;
use crate::plan::Plan;
use crate::resources::file::FileResource;
use crate::resources::link::LinkResource;
use crate::resources::{Resource, ResourceState};

/// Deployment state of one pack entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Every link is in place.
    Deployed,
    /// `on` would create or replace something.
    Pending,
    /// A user target is occupied by something dodot does not own.
    Conflict,
    /// A user target is on the protected-path list.
    Protected,
    /// The one-shot script ran with its current content.
    Completed,
    /// The one-shot script ran, but its content has changed since.
    Outdated,
    /// The one-shot script never ran.
    NotRun,
}

impl EntryState {
    /// Label used in text output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Deployed => "deployed",
            Self::Pending => "pending",
            Self::Conflict => "conflict",
            Self::Protected => "protected",
            Self::Completed => "completed",
            Self::Outdated => "outdated",
            Self::NotRun => "not run",
        }
    }
}

/// Status of one pack entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// Owning pack.
    pub pack: String,
    /// Entry path relative to the pack.
    pub relpath: String,
    /// Handler the entry is bound to.
    pub handler: HandlerKind,
    /// User-visible path, or the data-store entry for shell and path.
    pub target: Option<String>,
    /// Computed state.
    pub state: EntryState,
    /// What occupies a conflicting target, or the command line.
    pub detail: Option<String>,
    /// UTC completion time of a one-shot run.
    pub completed_at: Option<String>,
}

/// Compute the status of every entry in `plan`.
///
/// # Errors
///
/// Returns an error if a target or sentinel cannot be inspected.
pub fn compute(plan: &Plan, paths: &Paths, store: &DataStore) -> Result<Vec<StatusEntry>> {
    let mut out = Vec::new();
    for chunk in plan.operations.chunk_by(|a, b| {
        a.pack == b.pack && a.relpath == b.relpath && a.handler == b.handler
    }) {
        let Some(first) = chunk.first() else {
            continue;
        };
        let mut entry = StatusEntry {
            pack: first.pack.clone(),
            relpath: first.relpath.clone(),
            handler: first.handler,
            target: None,
            state: EntryState::Deployed,
            detail: None,
            completed_at: None,
        };
        match &first.kind {
            OperationKind::RunCommand { sentinel, .. } | OperationKind::CheckSentinel { sentinel } => {
                entry.detail = first.command_line();
                one_shot(&mut entry, store, sentinel)?;
            }
            _ => links(&mut entry, chunk, plan, paths, store)?,
        }
        out.push(entry);
    }
    Ok(out)
}

fn one_shot(entry: &mut StatusEntry, store: &DataStore, sentinel: &Sentinel) -> Result<()> {
    match store.read_sentinel(sentinel)? {
        Some(record) if record.hash == sentinel.hash => {
            entry.state = EntryState::Completed;
            entry.completed_at = record.completed_at;
        }
        _ if store
            .recorded_sentinel_for(&sentinel.pack, sentinel.handler, &sentinel.basename)?
            .is_some() =>
        {
            entry.state = EntryState::Outdated;
        }
        _ => entry.state = EntryState::NotRun,
    }
    Ok(())
}

fn links(
    entry: &mut StatusEntry,
    ops: &[Operation],
    plan: &Plan,
    paths: &Paths,
    store: &DataStore,
) -> Result<()> {
    let deployed = store.deployed_dir();
    let protected = plan
        .config_for(&entry.pack)
        .map(|c| protect::expand(paths, &c.protected_paths))
        .unwrap_or_default();
    let origin = ops.first().and_then(|op| match &op.kind {
        OperationKind::Link { source, .. }
        | OperationKind::WriteShellSnippet { source, .. }
        | OperationKind::AddToPath { source, .. } => Some(source.clone()),
        _ => None,
    });

    let mut pending = false;
    for op in ops {
        let (source, target, placement): (&Path, &Path, Option<Placement>) = match &op.kind {
            OperationKind::Link { source, target } | OperationKind::AddToPath { source, target } => {
                (source, target, None)
            }
            OperationKind::WriteShellSnippet {
                source,
                target,
                placement,
            } => (source, target, Some(*placement)),
            OperationKind::RunCommand { .. } | OperationKind::CheckSentinel { .. } => continue,
        };
        entry.target = Some(paths.display(target));

        if !store.owns(target) {
            let exposed = origin.as_deref().unwrap_or(source);
            if protect::violation(target, exposed, &protected).is_some() {
                entry.state = EntryState::Protected;
                return Ok(());
            }
        }
        let mut link = LinkResource::new(source.to_path_buf(), target.to_path_buf(), &deployed);
        if store.owns(source) {
            link = link.deferred_source();
        }
        match link.current_state()? {
            ResourceState::Correct => {}
            ResourceState::Conflict { existing } => {
                entry.state = EntryState::Conflict;
                entry.detail = Some(existing);
                return Ok(());
            }
            ResourceState::Invalid { reason } => {
                entry.detail = Some(reason);
                pending = true;
            }
            ResourceState::Missing | ResourceState::Incorrect { .. } => pending = true,
        }
        if let Some(placement) = placement {
            let sidecar = FileResource::new(
                placement.as_str(),
                store.placement_file(&op.pack, &op.relpath),
            );
            pending |= sidecar.current_state()? != ResourceState::Correct;
        }
    }
    if pending {
        entry.state = EntryState::Pending;
    }
    Ok(())
}

/// Grouped text listing, one block per pack.
#[must_use]
pub fn render_text(entries: &[StatusEntry]) -> String {
    let mut by_pack: BTreeMap<&str, Vec<&StatusEntry>> = BTreeMap::new();
    for e in entries {
        by_pack.entry(e.pack.as_str()).or_default().push(e);
    }
    let width = entries.iter().map(|e| e.relpath.len()).max().unwrap_or(0);

    let mut out = String::new();
    for (pack, list) in by_pack {
        let _ = writeln!(out, "{pack}");
        for e in list {
            let _ = write!(
                out,
                "  {:<width$}  {:<8}  {:<9}",
                e.relpath,
                e.handler.name(),
                e.state.label()
            );
            if let Some(target) = &e.target {
                let _ = write!(out, "  {target}");
            }
            if let Some(at) = &e.completed_at {
                let _ = write!(out, "  ({at})");
            } else if e.state == EntryState::Conflict
                && let Some(detail) = &e.detail
            {
                let _ = write!(out, "  ({detail})");
            }
            out.push('\n');
        }
    }
    if out.is_empty() {
        out.push_str("no entries\n");
    }
    out
}

/// JSON array of entries.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(entries: &[StatusEntry]) -> Result<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}
