//! Planning: packs → matches → operations, without side effects.
use anyhow::{Context as _, Result};
use std::collections::BTreeMap;

use crate::config::Config;
use crate::datastore::DataStore;
use crate::filesystem::FileSystemOps;
use crate::handlers::{self, Category, HandlerContext, HandlerKind};
use crate::operations::{self, Operation};
use crate::packs::Pack;
use crate::paths::Paths;
use crate::rules::{Match, RuleEngine};

/// Which handlers a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerFilter {
    /// Every handler (`on`, `status`).
    All,
    /// Configuration handlers only (`link`, `off`).
    Configuration,
    /// One-shot handlers only (`provision`).
    OneShot,
}

impl HandlerFilter {
    /// Whether `kind` passes the filter.
    #[must_use]
    pub fn accepts(self, kind: HandlerKind) -> bool {
        match self {
            Self::All => true,
            Self::Configuration => kind.category() == Category::Configuration,
            Self::OneShot => kind.category() == Category::OneShot,
        }
    }
}

/// A pack's resolved configuration, carried alongside its operations.
#[derive(Debug)]
pub struct PlannedPack {
    /// Pack name.
    pub name: String,
    /// Root config layered with the pack's own config.
    pub config: Config,
}

/// The ordered operations for a run.
#[derive(Debug)]
pub struct Plan {
    /// Operations in execution order.
    pub operations: Vec<Operation>,
    /// Every matched entry, for reporting.
    pub matches: Vec<Match>,
    /// Per-pack configs, keyed by pack name.
    pub packs: BTreeMap<String, PlannedPack>,
}

impl Plan {
    /// The resolved config for `pack`.
    #[must_use]
    pub fn config_for(&self, pack: &str) -> Option<&Config> {
        self.packs.get(pack).map(|p| &p.config)
    }
}

/// Plan `packs` under `root_config`, keeping handlers accepted by `filter`.
///
/// # Errors
///
/// Returns an error if a pack config is invalid, a pack cannot be listed,
/// or a handler rejects a match.
pub fn build(
    packs: &[Pack],
    root_config: &Config,
    paths: &Paths,
    store: &DataStore,
    fs: &dyn FileSystemOps,
    filter: HandlerFilter,
) -> Result<Plan> {
    let mut plan = Plan {
        operations: Vec::new(),
        matches: Vec::new(),
        packs: BTreeMap::new(),
    };
    for pack in packs {
        let config = pack.resolve_config(root_config)?;
        let engine = RuleEngine::new(config.rules())?;
        let entries = pack
            .entries(fs)
            .with_context(|| format!("listing pack {}", pack.name))?;
        let matches = engine.match_entries(pack, &entries);

        let ctx = HandlerContext {
            paths,
            config: &config,
            store,
            fs,
        };
        for kind in HandlerKind::ALL {
            if !filter.accepts(kind) {
                continue;
            }
            let group: Vec<&Match> = matches.iter().filter(|m| m.handler == kind).collect();
            if group.is_empty() {
                continue;
            }
            plan.operations
                .extend(handlers::operations_for(kind, &group, &ctx)?);
        }
        plan.matches
            .extend(matches.into_iter().filter(|m| filter.accepts(m.handler)));
        plan.packs.insert(
            pack.name.clone(),
            PlannedPack {
                name: pack.name.clone(),
                config,
            },
        );
    }
    operations::sort(&mut plan.operations);
    Ok(plan)
}
