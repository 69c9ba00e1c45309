//! # cmod CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmod_cli::inspect::{run_inspect, InspectArgs};
use cmod_cli::resolve::{run_resolve, ResolveArgs};
use cmod_cli::run::{run_demo, RunArgs};

/// cmod — class-derived state modules.
///
/// Resolves module namespaces, inspects classified module tables and runs
/// the bundled demo scenarios against the reference store.
#[derive(Parser, Debug)]
#[command(name = "cmod", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit log events as JSON lines instead of human-readable text.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize raw namespace identifiers.
    Resolve(ResolveArgs),

    /// Print the classified tables of a demo module tree.
    Inspect(InspectArgs),

    /// Run a demo scenario and print each step.
    Run(RunArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = match cmod_cli::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(2);
        }
    };

    let result = match cli.command {
        Commands::Resolve(args) => run_resolve(&args, &config),
        Commands::Inspect(args) => run_inspect(&args, &config),
        Commands::Run(args) => run_demo(&args, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
