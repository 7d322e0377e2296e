//! `status`: print per-file status without mutating anything.
use anyhow::Result;

use crate::cli::{Format, GlobalOpts, StatusOpts};
use crate::logging::{FileEntry, Log};
use crate::plan::HandlerFilter;
use crate::status;

/// Run the status command.
///
/// With `--format json` the progress output is demoted to debug so stdout
/// carries only the document.
///
/// # Errors
///
/// Returns an error if setup or planning fails, or a target cannot be
/// inspected.
pub fn run(global: &GlobalOpts, opts: &StatusOpts, log: &dyn Log) -> Result<()> {
    let quiet = Quiet(log);
    let log: &dyn Log = match opts.format {
        Format::Text => log,
        Format::Json => &quiet,
    };

    let setup = super::CommandSetup::init(global, &opts.packs.packs, log)?;
    let plan = setup.plan(HandlerFilter::All, log)?;
    let entries = status::compute(&plan, &setup.paths, &setup.store())?;

    let rendered = match opts.format {
        Format::Text => status::render_text(&entries),
        Format::Json => status::render_json(&entries)?,
    };
    #[allow(clippy::print_stdout)]
    {
        println!("{}", rendered.trim_end());
    }
    Ok(())
}

/// Forwards warnings and errors; everything else goes to debug.
struct Quiet<'a>(&'a dyn Log);

impl Log for Quiet<'_> {
    fn stage(&self, msg: &str) {
        self.0.debug(msg);
    }

    fn info(&self, msg: &str) {
        self.0.debug(msg);
    }

    fn debug(&self, msg: &str) {
        self.0.debug(msg);
    }

    fn warn(&self, msg: &str) {
        self.0.warn(msg);
    }

    fn error(&self, msg: &str) {
        self.0.error(msg);
    }

    fn dry_run(&self, msg: &str) {
        self.0.debug(msg);
    }

    fn record(&self, entry: FileEntry) {
        self.0.record(entry);
    }
}
