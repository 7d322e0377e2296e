//! `off`: remove deployed links and data-store entries.
use anyhow::Result;
use std::sync::Arc;

use super::Action;
use crate::cli::{GlobalOpts, PackArgs};
use crate::logging::Logger;
use crate::plan::HandlerFilter;

/// Run the off command.
///
/// Only configuration handlers leave links behind, so only they are
/// planned; sentinels of one-shot handlers survive.  A pack that is gone
/// from the dotfiles root can still be turned off while the data store
/// holds entries for it.
///
/// # Errors
///
/// Returns an error if setup fails or any removal failed.
pub fn run(global: &GlobalOpts, args: &PackArgs, log: &Arc<Logger>) -> Result<()> {
    super::run_mutating(
        global,
        &args.packs,
        HandlerFilter::Configuration,
        Action::Remove,
        log,
    )
}
