//! # Inspect Subcommand
//!
//! Prints the classified tables of a bundled demo module tree as JSON.

use anyhow::Result;
use clap::Args;

use cmod_core::CmodConfig;

use crate::demos::Demo;

/// Arguments for the `cmod inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Demo module tree to inspect.
    #[arg(value_enum)]
    pub demo: Demo,
}

/// Execute the inspect subcommand. Returns the process exit code.
pub fn run_inspect(args: &InspectArgs, config: &CmodConfig) -> Result<u8> {
    let module = args.demo.module(config);
    tracing::debug!(namespace = %module.namespace(), "inspecting module");
    println!("{}", serde_json::to_string_pretty(&module.summary())?);
    Ok(0)
}
