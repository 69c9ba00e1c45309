//! # Run Subcommand
//!
//! Registers a bundled demo in a fresh store, plays its scenario on a
//! current-thread runtime and prints every observed step.

use anyhow::{Context, Result};
use clap::Args;

use cmod_core::CmodConfig;

use crate::demos::Demo;

/// Arguments for the `cmod run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Demo scenario to run.
    #[arg(value_enum)]
    pub demo: Demo,

    /// Print the final state tree after the scenario.
    #[arg(long)]
    pub snapshot: bool,

    /// Print steps as JSON lines.
    #[arg(long)]
    pub json: bool,
}

/// Execute the run subcommand. Returns the process exit code.
pub fn run_demo(args: &RunArgs, config: &CmodConfig) -> Result<u8> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let (store, steps) = runtime
        .block_on(args.demo.run(config))
        .with_context(|| format!("demo {:?} failed", args.demo))?;

    for step in &steps {
        if args.json {
            println!("{}", serde_json::to_string(step)?);
        } else {
            println!("{}: {}", step.label, step.value);
        }
    }
    if args.snapshot {
        println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
    }
    Ok(0)
}
