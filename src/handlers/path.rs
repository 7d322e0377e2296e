//! PATH handler: expose a pack directory on `$PATH`.
use anyhow::{Result, bail};

use super::{HandlerContext, HandlerKind};
use crate::operations::{Operation, OperationKind};
use crate::rules::Match;

/// Emit the `deployed/path/<pack>-<dir>` link for a matched directory.
///
/// # Errors
///
/// Returns an error if the match is not a directory.
pub fn operation(m: &Match, ctx: &HandlerContext<'_>) -> Result<Operation> {
    if !m.is_dir {
        bail!(
            "path handler expects a directory, but {}/{} is a file",
            m.pack,
            m.relpath
        );
    }
    Ok(Operation {
        pack: m.pack.clone(),
        handler: HandlerKind::Path,
        relpath: m.relpath.clone(),
        kind: OperationKind::AddToPath {
            source: m.source(),
            target: ctx.store.path_entry(&m.pack, &m.relpath),
        },
    })
}
