//! # cmod-core — Foundational Types for Class-Shaped Store Modules
//!
//! This crate is the leaf of the cmod workspace. It defines the primitives
//! every other crate agrees on: how a module's namespace is computed, which
//! member names are reserved, how errors are classified, and the trait
//! boundary behind which a backing store lives.
//!
//! ## Key Design Principles
//!
//! 1. **Namespaces are segment lists, not strings.** `Namespace` is built by
//!    the resolver from a raw identifier (possibly a file path) and only
//!    joined into a `a/b/name` key at the routing boundary.
//!
//! 2. **One error type crosses the store boundary.** `StoreError` is what a
//!    backing store returns and what every user handler returns. Failures
//!    raised by user code travel inside `StoreError::Handler` untouched.
//!
//! 3. **The backing store is a trait.** `StoreLike` names the commit,
//!    dispatch, state and getter primitives. The reference engine lives in
//!    `cmod-store`; embedders may bring their own.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cmod-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod error;
pub mod namespace;
pub mod services;
pub mod traits;

use serde_json::{Map, Value};

// Re-export primary types for ergonomic imports.
pub use config::{CmodConfig, NamespaceConfig, StoreConfig};
pub use error::{ConfigError, HandlerResult, RegistrationError, StoreError};
pub use namespace::{Namespace, NAMESPACE_SEPARATOR};
pub use services::Services;
pub use traits::{BoxFuture, HasStore, SharedStore, StoreLike};

/// The field map of one module's state slice.
pub type StateMap = Map<String, Value>;
