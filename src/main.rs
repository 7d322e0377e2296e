//! `dodot` binary: parses arguments, sets up logging and dispatches.
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use dodot::cli::{self, Command};
use dodot::plan::HandlerFilter;
use dodot::{commands, error, logging};

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    let name = args.command.name();
    logging::init_subscriber(args.verbose, name);
    let log = Arc::new(logging::Logger::new(name));
    let global = &args.global;

    let result = match &args.command {
        Command::On(a) => commands::on::run(global, a, HandlerFilter::All, &log),
        Command::Link(a) => commands::on::run(global, a, HandlerFilter::Configuration, &log),
        Command::Provision(a) => commands::on::run(global, a, HandlerFilter::OneShot, &log),
        Command::Off(a) => commands::off::run(global, a, &log),
        Command::Status(opts) => commands::status::run(global, opts, log.as_ref()),
        Command::AddIgnore(opts) => commands::add_ignore::run(global, opts, log.as_ref()),
        Command::Version => {
            commands::version::run();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log.error(&format!("{e:#}"));
            ExitCode::from(error::exit_code(&e))
        }
    }
}
