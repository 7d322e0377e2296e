//! Operations: the executor-consumable output of handlers.
use std::path::{Path, PathBuf};

use crate::datastore::Sentinel;
use crate::handlers::{HandlerKind, Placement};

/// What an operation does.
///
/// Links are described the way `ln -s` takes them: `source` is what the
/// link points at, `target` is where the link is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    /// Create a symbolic link.
    Link {
        /// Path the link resolves to.
        source: PathBuf,
        /// Path of the link itself.
        target: PathBuf,
    },
    /// Link a shell snippet into the data store and record its placement.
    WriteShellSnippet {
        /// Snippet in the pack.
        source: PathBuf,
        /// Data-store entry.
        target: PathBuf,
        /// Loader phase.
        placement: Placement,
    },
    /// Link a directory into the data store for `$PATH`.
    AddToPath {
        /// Directory in the pack.
        source: PathBuf,
        /// Data-store entry.
        target: PathBuf,
    },
    /// Run a command once per sentinel.
    RunCommand {
        /// Executable.
        program: String,
        /// Arguments.
        args: Vec<String>,
        /// Guarding sentinel.
        sentinel: Sentinel,
    },
    /// Report whether a sentinel is present, without side effects.
    CheckSentinel {
        /// Sentinel to check.
        sentinel: Sentinel,
    },
}

/// A single planned action, attributed to the pack entry that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Owning pack.
    pub pack: String,
    /// Handler that emitted the operation.
    pub handler: HandlerKind,
    /// Entry path relative to the pack.
    pub relpath: String,
    /// The action.
    pub kind: OperationKind,
}

impl Operation {
    /// The path this operation writes, if it writes one.
    #[must_use]
    pub fn target(&self) -> Option<&Path> {
        match &self.kind {
            OperationKind::Link { target, .. }
            | OperationKind::WriteShellSnippet { target, .. }
            | OperationKind::AddToPath { target, .. } => Some(target),
            OperationKind::RunCommand { .. } | OperationKind::CheckSentinel { .. } => None,
        }
    }

    /// The read-only counterpart used by `status`: commands become
    /// sentinel checks, everything else is unchanged.
    #[must_use]
    pub fn as_check(&self) -> Self {
        match &self.kind {
            OperationKind::RunCommand { sentinel, .. } => Self {
                kind: OperationKind::CheckSentinel {
                    sentinel: sentinel.clone(),
                },
                ..self.clone()
            },
            _ => self.clone(),
        }
    }

    /// Command line of a `RunCommand`, for display.
    #[must_use]
    pub fn command_line(&self) -> Option<String> {
        match &self.kind {
            OperationKind::RunCommand { program, args, .. } => {
                let mut parts = vec![program.clone()];
                parts.extend(args.iter().cloned());
                Some(parts.join(" "))
            }
            _ => None,
        }
    }
}

/// Order operations by handler execution rank, then pack, then relative
/// path.  Operations emitted for the same entry keep their relative order.
pub fn sort(ops: &mut [Operation]) {
    ops.sort_by(|a, b| {
        a.handler
            .cmp(&b.handler)
            .then_with(|| a.pack.cmp(&b.pack))
            .then_with(|| a.relpath.cmp(&b.relpath))
    });
}
