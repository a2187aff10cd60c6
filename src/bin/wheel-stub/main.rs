//! wheel-stub CLI - PEP 517 hooks for stub packages

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use wheel_stub::util::diagnostic;
use wheel_stub::StubError;

mod cli;
mod commands;

use cli::{Cli, Commands};

/// Environment variable holding the log filter.
const LOGLEVEL_ENV: &str = "WHEEL_STUB_LOGLEVEL";

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        match e.downcast_ref::<StubError>() {
            Some(err) => diagnostic::emit(&err.to_diagnostic(), color),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::BuildSdist(args) => commands::build_sdist::execute(args),
        Commands::BuildWheel(args) => commands::build_wheel::execute(args),
        Commands::Inspect(args) => commands::inspect::execute(args),
        Commands::CudaInfo => commands::cuda_info::execute(),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Log to stderr; stdout carries only hook results.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "wheel_stub=debug"
    } else {
        "wheel_stub=info"
    };

    let requested = std::env::var(LOGLEVEL_ENV).ok().filter(|v| !v.trim().is_empty());
    let (filter, rejected) = match requested.as_deref().map(parse_filter) {
        Some(Some(filter)) => (filter, None),
        Some(None) => (EnvFilter::new(default), requested.clone()),
        None => (EnvFilter::new(default), None),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if let Some(value) = rejected {
        tracing::warn!(
            "Bad user supplied log level: {}; falling back to {}",
            value,
            default
        );
    }
}

/// Accept a bare level (`DEBUG`, `info`) scoped to this crate, or a full
/// filter directive.
fn parse_filter(value: &str) -> Option<EnvFilter> {
    let value = value.trim();
    if let Ok(level) = value.to_ascii_lowercase().parse::<LevelFilter>() {
        return Some(EnvFilter::new(format!("wheel_stub={}", level)));
    }
    EnvFilter::try_new(value).ok()
}
