//! Top-level subcommand orchestration.
pub mod add_ignore;
pub mod off;
pub mod on;
pub mod status;
pub mod version;

use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cli::GlobalOpts;
use crate::config::{Config, validation};
use crate::datastore::{DataStore, StoreLock};
use crate::error::UserInputError;
use crate::exec::SystemExecutor;
use crate::executor::{self, Context, process_single};
use crate::filesystem::SystemFileSystemOps;
use crate::logging::{self, Log, Logger};
use crate::packs::{Pack, Scanner};
use crate::paths::Paths;
use crate::plan::{self, HandlerFilter, Plan};
use crate::resources::Resource;
use crate::shell;

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates path resolution, configuration loading and pack selection
/// so that each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Resolved home, XDG, data-store and dotfiles-root paths.
    pub paths: Arc<Paths>,
    /// The root configuration layered over the defaults.
    pub config: Config,
    /// Selected packs that exist in the dotfiles root.
    pub packs: Vec<Pack>,
}

impl CommandSetup {
    /// Resolve paths, load the root configuration, and select `packs`.
    ///
    /// # Errors
    ///
    /// Returns an error if the dotfiles root cannot be determined, the
    /// configuration fails to load, or a named pack does not exist.
    pub fn init(global: &GlobalOpts, packs: &[String], log: &dyn Log) -> Result<Self> {
        let (paths, config) = load(global, log)?;
        let packs =
            Scanner::new(&paths.dotfiles_root, &config, &SystemFileSystemOps).select(packs)?;
        log.info(&format!("{} pack(s) selected", packs.len()));
        let names: Vec<String> = packs.iter().map(|p| p.name.clone()).collect();
        logging::record_run(&paths.dotfiles_root, &paths.data_dir, &names);

        Ok(Self {
            paths: Arc::new(paths),
            config,
            packs,
        })
    }

    /// Like [`init`](Self::init), but also accepts packs that are gone from
    /// the dotfiles root (deleted or ignored) while the data store still
    /// holds entries for them.  With no names, every deployed pack is
    /// included.
    ///
    /// Returns the setup and the sorted names of every pack to clear.
    ///
    /// # Errors
    ///
    /// Returns an error if setup fails, or a named pack neither exists nor
    /// has data-store entries.
    pub fn init_for_removal(
        global: &GlobalOpts,
        names: &[String],
        log: &dyn Log,
    ) -> Result<(Self, Vec<String>)> {
        let (paths, config) = load(global, log)?;
        let store = DataStore::new(&paths.data_dir);
        let scanner = Scanner::new(&paths.dotfiles_root, &config, &SystemFileSystemOps);
        let discovered: BTreeSet<String> =
            scanner.discover()?.into_iter().map(|(name, _)| name).collect();

        let wanted: BTreeSet<String> = if names.is_empty() {
            let mut all = discovered.clone();
            all.extend(store.deployed_packs()?);
            all
        } else {
            names.iter().cloned().collect()
        };

        let mut present = Vec::new();
        for name in &wanted {
            if discovered.contains(name) {
                present.push(name.clone());
            } else if store.has_pack(name)? {
                log.info(&format!("{name}: not in the dotfiles root, clearing its data-store entries"));
            } else {
                return Err(UserInputError::UnknownPack(name.clone()).into());
            }
        }
        let packs = if present.is_empty() {
            Vec::new()
        } else {
            scanner.select(&present)?
        };
        log.info(&format!("{} pack(s) selected", wanted.len()));
        let cleared: Vec<String> = wanted.into_iter().collect();
        logging::record_run(&paths.dotfiles_root, &paths.data_dir, &cleared);

        let setup = Self {
            paths: Arc::new(paths),
            config,
            packs,
        };
        Ok((setup, cleared))
    }

    /// The data store for the resolved paths.
    #[must_use]
    pub fn store(&self) -> DataStore {
        DataStore::new(&self.paths.data_dir)
    }

    /// Plan the selected packs for `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pack config is invalid or a handler rejects an
    /// entry.
    pub fn plan(&self, filter: HandlerFilter, log: &dyn Log) -> Result<Plan> {
        log.stage("Planning");
        let plan = plan::build(
            &self.packs,
            &self.config,
            &self.paths,
            &self.store(),
            &SystemFileSystemOps,
            filter,
        )?;
        log.debug(&format!(
            "{} operation(s) for {} matched entries",
            plan.operations.len(),
            plan.matches.len()
        ));
        Ok(plan)
    }
}

/// Resolve paths and load the root configuration, logging validation
/// warnings.
fn load(global: &GlobalOpts, log: &dyn Log) -> Result<(Paths, Config)> {
    let paths = Paths::from_env(global.dotfiles_root.as_deref())?;
    log.debug(&format!("dotfiles root: {}", paths.dotfiles_root.display()));
    log.debug(&format!("data dir: {}", paths.data_dir.display()));

    log.stage("Loading configuration");
    let config = Config::load(&paths.dotfiles_root, &SystemFileSystemOps)?;
    log.debug(&format!("{} rules", config.rules().len()));

    let warnings = validation::validate(&config);
    if !warnings.is_empty() {
        log.warn(&format!(
            "found {} configuration warning(s):",
            warnings.len()
        ));
        for warning in &warnings {
            log.warn(&format!("  {warning}"));
        }
    }
    Ok((paths, config))
}

/// What a mutating command does with its plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Materialise the plan.
    Deploy,
    /// Remove what the plan deployed.
    Remove,
}

/// Plan, lock, execute, and summarise a mutating command.
///
/// # Errors
///
/// Returns an error if setup fails, the data store is locked by another
/// process, or any operation failed.
pub fn run_mutating(
    global: &GlobalOpts,
    packs: &[String],
    filter: HandlerFilter,
    action: Action,
    log: &Arc<Logger>,
) -> Result<()> {
    let (setup, cleared) = match action {
        Action::Deploy => (CommandSetup::init(global, packs, log.as_ref())?, Vec::new()),
        Action::Remove => CommandSetup::init_for_removal(global, packs, log.as_ref())?,
    };
    let plan = setup.plan(filter, log.as_ref())?;

    let store = setup.store();
    let _lock: Option<StoreLock> = if global.dry_run {
        None
    } else {
        Some(store.lock()?)
    };

    let ctx = Context::new(
        Arc::clone(&setup.paths),
        log.clone(),
        global.dry_run,
        global.force,
        Arc::new(SystemExecutor),
    );
    install_interrupt_handler(&ctx.interrupted, log.as_ref());

    if !global.dry_run {
        install_loaders(&ctx)?;
    }

    let result = match action {
        Action::Deploy => executor::execute(&ctx, &plan),
        Action::Remove => executor::remove(&ctx, &plan, &cleared),
    };

    log.print_summary();
    if !global.dry_run && action == Action::Deploy {
        log.info(&format!(
            "add to your shell profile: {}",
            shell::source_line(&shell::posix_loader_path(&store))
        ));
    }
    result.map(|_| ())
}

/// Write the loader scripts when their content differs from the embedded
/// copies.
///
/// # Errors
///
/// Returns an error if a loader cannot be written.
pub fn install_loaders(ctx: &Context) -> Result<()> {
    for loader in shell::loader_resources(&ctx.store) {
        let state = loader.current_state()?;
        process_single(ctx, &loader, state, "install loader")?;
    }
    Ok(())
}

/// Flag the run as interrupted on SIGINT.
///
/// A running child receives the signal from the terminal itself; the
/// executor notices the flag once the child exits.
fn install_interrupt_handler(flag: &Arc<AtomicBool>, log: &dyn Log) {
    let flag = Arc::clone(flag);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        log.debug(&format!("interrupt handler not installed: {e}"));
    }
}
