//! # Backing Store Trait
//!
//! Defines the boundary between the module engine and the state container
//! that owns live state. The engine never touches state directly: facades
//! and contexts read through these primitives and write only by committing
//! a fully qualified mutator key.
//!
//! ## Routing
//!
//! Every key passed to [`StoreLike::commit`], [`StoreLike::dispatch`] and
//! [`StoreLike::getter`] is root-scoped: it is the full `namespace/name`
//! path, never a key relative to the calling module.
//!
//! ## Concurrency
//!
//! Implementations must serialize commits so that no two mutators
//! interleave, and must never hold a lock while user getter or action code
//! runs. The trait requires `Send + Sync` so a store can be shared by
//! actions running on any executor thread.

use std::sync::Arc;

use serde_json::Value;

use crate::error::StoreError;
use crate::namespace::Namespace;
use crate::services::Services;
use crate::StateMap;

/// Boxed, sendable future returned by dispatch.
pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;

/// A shared handle to a backing store.
pub type SharedStore = Arc<dyn StoreLike>;

/// The primitives a backing store exposes to the module engine.
pub trait StoreLike: Send + Sync {
    /// True if a module is registered at `namespace`.
    fn has_module(&self, namespace: &Namespace) -> bool;

    /// A copy of the module's current state slice.
    fn state_slice(&self, namespace: &Namespace) -> Result<StateMap, StoreError>;

    /// The current value of one state field. Absent fields read as `null`.
    fn state_field(&self, namespace: &Namespace, field: &str) -> Result<Value, StoreError> {
        let slice = self.state_slice(namespace)?;
        Ok(slice.get(field).cloned().unwrap_or(Value::Null))
    }

    /// The whole state tree, child modules nested under their segments.
    fn root_state(&self) -> Value;

    /// Evaluate a getter by qualified key.
    fn getter(&self, key: &str) -> Result<Value, StoreError>;

    /// Evaluate a getter through a root-level table, if the store has a
    /// richer one than [`StoreLike::getter`]. Callers prefer this lookup and
    /// fall back to the scoped one on `None`.
    fn root_getter(&self, _key: &str) -> Option<Result<Value, StoreError>> {
        None
    }

    /// Apply a mutator by qualified key.
    fn commit(&self, key: &str, payload: Value) -> Result<(), StoreError>;

    /// Invoke an action by qualified key.
    fn dispatch(&self, key: &str, payload: Value) -> BoxFuture<'static, Result<Value, StoreError>>;

    /// Ambient services injected into this store.
    fn services(&self) -> &Services;
}

/// Anything that can hand out the backing store it is bound to.
///
/// Implemented by stores themselves and by execution contexts, so a facade
/// can be built from either.
pub trait HasStore {
    /// The backing store.
    fn store(&self) -> SharedStore;
}

impl HasStore for SharedStore {
    fn store(&self) -> SharedStore {
        Arc::clone(self)
    }
}
