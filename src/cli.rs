//! Command-line surface: subcommands and shared flags.
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Top-level CLI entry point for the dotfiles deployment engine.
#[derive(Parser, Debug)]
#[command(
    name = "dodot",
    about = "Deploy dotfile packs through a two-hop data store",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Flags shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Re-run one-shot handlers and let later packs take over targets
    #[arg(short, long, global = true)]
    pub force: bool,

    /// Dotfiles root (default: $DOTFILES_ROOT, then the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub dotfiles_root: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deploy packs with every handler
    On(PackArgs),
    /// Remove deployed links and data-store entries (sentinels are kept)
    Off(PackArgs),
    /// Show per-file deployment status without changing anything
    Status(StatusOpts),
    /// Deploy packs with configuration handlers only (no install or brew)
    Link(PackArgs),
    /// Run one-shot handlers only (install scripts and Brewfiles)
    Provision(PackArgs),
    /// Mark a pack as ignored by writing its ignore file
    AddIgnore(AddIgnoreOpts),
    /// Print version information
    Version,
}

impl Command {
    /// Subcommand name, used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::On(_) => "on",
            Self::Off(_) => "off",
            Self::Status(_) => "status",
            Self::Link(_) => "link",
            Self::Provision(_) => "provision",
            Self::AddIgnore(_) => "add-ignore",
            Self::Version => "version",
        }
    }
}

/// Pack selection; empty means every pack.
#[derive(Args, Debug, Clone, Default)]
pub struct PackArgs {
    /// Packs to operate on (default: all)
    #[arg(value_name = "PACK")]
    pub packs: Vec<String>,
}

/// Output format for `status`.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// Grouped listing
    #[default]
    Text,
    /// JSON array
    Json,
}

/// Options for the `status` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct StatusOpts {
    /// Packs to report on.
    #[command(flatten)]
    pub packs: PackArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

/// Options for the `add-ignore` subcommand.
#[derive(Args, Debug, Clone)]
pub struct AddIgnoreOpts {
    /// Pack to ignore
    pub pack: String,
}
