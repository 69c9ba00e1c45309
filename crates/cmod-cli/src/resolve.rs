//! # Resolve Subcommand
//!
//! Prints the normalized namespace of each raw identifier, using the
//! namespace rules from the loaded configuration.

use anyhow::Result;
use clap::Args;

use cmod_core::{CmodConfig, Namespace};

/// Arguments for the `cmod resolve` subcommand.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Raw identifiers, e.g. `./store/cart/items/index.ts`.
    #[arg(value_name = "RAW", required = true)]
    pub raw: Vec<String>,

    /// Print a JSON array of segment lists instead of one line per input.
    #[arg(long)]
    pub json: bool,
}

/// Resolve every identifier with the configured rules.
pub fn resolve_all(args: &ResolveArgs, config: &CmodConfig) -> Vec<Namespace> {
    args.raw
        .iter()
        .map(|raw| Namespace::resolve_with(raw, &config.namespace))
        .collect()
}

/// Execute the resolve subcommand. Returns the process exit code.
pub fn run_resolve(args: &ResolveArgs, config: &CmodConfig) -> Result<u8> {
    let resolved = resolve_all(args, config);
    if args.json {
        let segments: Vec<&[String]> = resolved.iter().map(Namespace::segments).collect();
        println!("{}", serde_json::to_string_pretty(&segments)?);
    } else {
        for (raw, namespace) in args.raw.iter().zip(&resolved) {
            println!("{raw} -> {namespace}");
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_all() {
        let args = ResolveArgs {
            raw: vec!["./store/elements/active/index.ts".into(), "nested".into()],
            json: false,
        };
        let resolved = resolve_all(&args, &CmodConfig::default());
        assert_eq!(resolved[0].path(), "elements/active");
        assert_eq!(resolved[1].path(), "nested");
    }

    #[test]
    fn test_resolve_with_custom_root() {
        let config = CmodConfig::from_yaml_str("namespace:\n  store_root: modules\n").unwrap();
        let args = ResolveArgs {
            raw: vec!["src/modules/cart/index.js".into()],
            json: true,
        };
        assert_eq!(resolve_all(&args, &config)[0].path(), "cart");
    }
}
