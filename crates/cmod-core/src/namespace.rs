//! # Namespace Resolution
//!
//! A module is addressed by an ordered list of path segments. Authors
//! usually declare the namespace as the path of the file the module lives
//! in (`./store/cart/items/index.ts`), so the resolver strips the
//! conventional parts of such a path before splitting it:
//!
//! 1. everything up to and including the first `store/` directory,
//! 2. a known file extension on the final segment,
//! 3. a trailing `index` segment,
//! 4. empty and `.` segments.
//!
//! Two identifiers that normalize to the same segment list denote the same
//! namespace. Detecting such collisions is the backing store's job.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::NamespaceConfig;

/// Separator used both for raw identifiers and for qualified routing keys.
pub const NAMESPACE_SEPARATOR: char = '/';

/// The ordered segment path of a module inside one store tree.
///
/// The empty path is the root module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace(Vec<String>);

impl Namespace {
    /// The root namespace (no segments).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Resolve a raw identifier with the default rules.
    pub fn resolve(raw: &str) -> Self {
        Self::resolve_with(raw, &NamespaceConfig::default())
    }

    /// Resolve a raw identifier with explicit rules.
    pub fn resolve_with(raw: &str, config: &NamespaceConfig) -> Self {
        let trimmed = strip_store_root(raw.trim(), &config.store_root);
        let mut segments: Vec<String> = trimmed
            .split(NAMESPACE_SEPARATOR)
            .filter(|s| !s.is_empty() && *s != ".")
            .map(str::to_string)
            .collect();

        if let Some(last) = segments.last_mut() {
            if let Some(stem) = strip_extension(last, &config.extensions) {
                *last = stem;
            }
        }
        if config.strip_index && segments.last().map(String::as_str) == Some("index") {
            segments.pop();
        }
        segments.retain(|s| !s.is_empty() && s != ".");
        Self(segments)
    }

    /// Build a namespace from already-normalized segments. Empty segments
    /// are dropped.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            segments
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        )
    }

    /// The ordered segments.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// True for the root namespace.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The joined path, e.g. `cart/items`. Empty for the root.
    pub fn path(&self) -> String {
        self.0.join("/")
    }

    /// The fully qualified routing key of a member of this module.
    pub fn qualify(&self, name: &str) -> String {
        if self.is_root() {
            name.to_string()
        } else {
            format!("{}{}{}", self.path(), NAMESPACE_SEPARATOR, name)
        }
    }

    /// True if `self` is a strict prefix of `other`.
    pub fn is_ancestor_of(&self, other: &Namespace) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    /// The segments of `self` below `ancestor`, if `ancestor` is a prefix.
    pub fn relative_to(&self, ancestor: &Namespace) -> Option<&[String]> {
        self.0.strip_prefix(ancestor.0.as_slice())
    }

    /// The enclosing namespace, or `None` for the root.
    pub fn parent(&self) -> Option<Namespace> {
        match self.0.split_last() {
            Some((_, rest)) => Some(Self(rest.to_vec())),
            None => None,
        }
    }

    /// Human-readable name used in logs and error messages.
    pub fn display_name(&self) -> String {
        if self.is_root() {
            "<root>".to_string()
        } else {
            self.path()
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl From<&str> for Namespace {
    fn from(raw: &str) -> Self {
        Self::resolve(raw)
    }
}

fn strip_store_root<'a>(raw: &'a str, root: &str) -> &'a str {
    if root.is_empty() {
        return raw;
    }
    let marker = format!("{sep}{root}{sep}", sep = NAMESPACE_SEPARATOR);
    if let Some(pos) = raw.find(&marker) {
        return &raw[pos + marker.len()..];
    }
    let leading = format!("{root}{NAMESPACE_SEPARATOR}");
    raw.strip_prefix(leading.as_str()).unwrap_or(raw)
}

fn strip_extension(segment: &str, extensions: &[String]) -> Option<String> {
    let (stem, ext) = segment.rsplit_once('.')?;
    if extensions.iter().any(|known| known == ext) {
        Some(stem.to_string())
    } else {
        None
    }
}
