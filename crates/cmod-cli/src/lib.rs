//! # cmod-cli — Command-Line Interface
//!
//! ## Subcommands
//!
//! - `resolve` — normalize raw namespace identifiers
//! - `inspect` — print the classified tables of a demo module tree
//! - `run` — play a demo scenario against the reference store
//!
//! Argument parsing lives in `main.rs`; handlers here delegate to the
//! library crates.

use std::path::Path;

use anyhow::{Context, Result};

use cmod_core::CmodConfig;

pub mod demos;
pub mod inspect;
pub mod resolve;
pub mod run;

/// Load the configuration file, or the defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<CmodConfig> {
    match path {
        Some(path) => CmodConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display())),
        None => Ok(CmodConfig::default()),
    }
}
