//! Shell snippet handler.
use anyhow::Result;

use super::{HandlerContext, HandlerKind, Placement, require_file};
use crate::operations::{Operation, OperationKind};
use crate::rules::Match;

/// Placement for a snippet: the `placement` option if set, otherwise
/// inferred from the file name.
#[must_use]
pub fn placement_for(m: &Match) -> Placement {
    if let Some(p) = m.options.get("placement").and_then(|v| v.parse().ok()) {
        return p;
    }
    let name = m.filename.to_ascii_lowercase();
    if name.contains("alias") {
        Placement::Aliases
    } else if name.starts_with("login") {
        Placement::Login
    } else {
        Placement::Environment
    }
}

/// Emit the snippet link into `deployed/shell/<pack>/`.
///
/// # Errors
///
/// Returns an error if the match is a directory.
pub fn operation(m: &Match, ctx: &HandlerContext<'_>) -> Result<Operation> {
    require_file(HandlerKind::Shell, m)?;
    Ok(Operation {
        pack: m.pack.clone(),
        handler: HandlerKind::Shell,
        relpath: m.relpath.clone(),
        kind: OperationKind::WriteShellSnippet {
            source: m.source(),
            target: ctx.store.shell_entry(&m.pack, &m.filename),
            placement: placement_for(m),
        },
    })
}
