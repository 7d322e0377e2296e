//! `on`, `link` and `provision`: deploy packs with a handler filter.
use anyhow::Result;
use std::sync::Arc;

use super::Action;
use crate::cli::{GlobalOpts, PackArgs};
use crate::logging::Logger;
use crate::plan::HandlerFilter;

/// Run a deploying command.
///
/// # Errors
///
/// Returns an error if setup fails or any operation failed.
pub fn run(
    global: &GlobalOpts,
    args: &PackArgs,
    filter: HandlerFilter,
    log: &Arc<Logger>,
) -> Result<()> {
    super::run_mutating(global, &args.packs, filter, Action::Deploy, log)
}
