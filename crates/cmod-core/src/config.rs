//! # Configuration
//!
//! Tunables for namespace resolution, reserved member names and store
//! registration. Every field has a default, so an empty YAML document is a
//! valid configuration.
//!
//! ```yaml
//! reserved_prefixes: ["$", "_"]
//! namespace:
//!   store_root: store
//!   strip_index: true
//!   extensions: [ts, js, rs]
//! store:
//!   strict_registration: true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration shared by the builder and the reference store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmodConfig {
    /// Member names starting with any of these prefixes are never classified.
    pub reserved_prefixes: Vec<String>,
    /// Namespace resolution rules.
    pub namespace: NamespaceConfig,
    /// Backing-store registration rules.
    pub store: StoreConfig,
}

impl Default for CmodConfig {
    fn default() -> Self {
        Self {
            reserved_prefixes: default_reserved_prefixes(),
            namespace: NamespaceConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl CmodConfig {
    /// Parse a configuration from a YAML document.
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(input)?)
    }

    /// Load a configuration file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// True if `name` starts with a reserved prefix.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && name.starts_with(prefix.as_str()))
    }
}

/// Rules applied when turning a raw identifier into a [`crate::Namespace`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Directory name marking the conventional store root. Everything up to
    /// and including its first occurrence is stripped. Empty disables it.
    pub store_root: String,
    /// Drop a trailing `index` segment.
    pub strip_index: bool,
    /// File extensions stripped from the final segment.
    pub extensions: Vec<String>,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            store_root: "store".to_string(),
            strip_index: true,
            extensions: vec!["ts".to_string(), "js".to_string(), "rs".to_string()],
        }
    }
}

/// Registration rules for the reference store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Reject child modules whose namespace does not extend the parent's.
    /// When false the violation is logged and the child is registered at its
    /// own namespace anyway.
    pub strict_registration: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            strict_registration: true,
        }
    }
}

fn default_reserved_prefixes() -> Vec<String> {
    vec!["$".to_string(), "_".to_string()]
}
