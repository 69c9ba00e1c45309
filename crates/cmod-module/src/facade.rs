//! # Instance Facade
//!
//! [`use_module`] binds a descriptor to a backing store and returns a
//! [`ModuleFacade`]: the externally consumable handle whose every read goes
//! to the live store. Facades hold no state of their own and are cheap to
//! drop and rebuild.
//!
//! ## Routing
//!
//! Commits and dispatches issued through a facade always use the fully
//! qualified, root-scoped key (`namespace/name`). Getter reads prefer the
//! store's root getter table and fall back to the scoped one.
//!
//! ## Read-only facades
//!
//! Facades reached from a getter context are read-only: their committers
//! and dispatchers fail with [`StoreError::ReadOnly`] without touching the
//! store.

use std::fmt;
use std::sync::Arc;

use futures::future;
use serde::de::DeserializeOwned;
use serde_json::Value;

use cmod_core::{BoxFuture, HandlerResult, HasStore, Namespace, SharedStore, StoreError, StoreLike};

use crate::descriptor::ModuleDescriptor;

/// Whether a handle may write to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    ReadOnly,
}

/// Bind `module` to the store behind `ctx`.
///
/// Fails with [`StoreError::NotWired`] if the store has no module at the
/// descriptor's namespace.
pub fn use_module<C>(module: &Arc<ModuleDescriptor>, ctx: &C) -> HandlerResult<ModuleFacade>
where
    C: HasStore + ?Sized,
{
    ModuleFacade::bind(ctx.store(), Arc::clone(module), Access::ReadWrite)
}

pub(crate) fn ensure_wired(store: &dyn StoreLike, module: &ModuleDescriptor) -> HandlerResult<()> {
    if store.has_module(module.namespace()) {
        Ok(())
    } else {
        Err(StoreError::NotWired {
            namespace: module.namespace().display_name(),
        })
    }
}

/// Read a getter by qualified key, root table first.
pub(crate) fn read_getter(store: &dyn StoreLike, key: &str) -> HandlerResult {
    store.root_getter(key).unwrap_or_else(|| store.getter(key))
}

fn nested_state(root: &Value, namespace: &Namespace, field: &str) -> Option<Value> {
    namespace
        .segments()
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(field))
        .try_fold(root, |node, segment| node.get(segment))
        .cloned()
}

fn read_only(operation: String) -> StoreError {
    tracing::warn!(%operation, "rejected write from a read-only context");
    StoreError::ReadOnly { operation }
}

// ─── Bound invokers ─────────────────────────────────────────────────────

/// A mutator bound to a store: calling it commits.
#[derive(Clone)]
pub struct Committer {
    store: SharedStore,
    key: String,
    access: Access,
}

impl Committer {
    /// The qualified key this committer writes to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Commit `payload` under the bound key.
    pub fn call(&self, payload: Value) -> HandlerResult<()> {
        if self.access == Access::ReadOnly {
            return Err(read_only(format!("commit '{}'", self.key)));
        }
        self.store.commit(&self.key, payload)
    }
}

impl fmt::Debug for Committer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Committer")
            .field("key", &self.key)
            .field("access", &self.access)
            .finish()
    }
}

/// An action bound to a store: calling it dispatches.
#[derive(Clone)]
pub struct Dispatcher {
    store: SharedStore,
    key: String,
    access: Access,
}

impl Dispatcher {
    /// The qualified key this dispatcher invokes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Dispatch `payload` under the bound key.
    pub fn call(&self, payload: Value) -> BoxFuture<'static, HandlerResult> {
        if self.access == Access::ReadOnly {
            let err = read_only(format!("dispatch '{}'", self.key));
            return Box::pin(future::ready(Err(err)));
        }
        self.store.dispatch(&self.key, payload)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("key", &self.key)
            .field("access", &self.access)
            .finish()
    }
}

// ─── Facade ─────────────────────────────────────────────────────────────

/// The live view of one module in one store.
#[derive(Clone)]
pub struct ModuleFacade {
    pub(crate) store: SharedStore,
    pub(crate) module: Arc<ModuleDescriptor>,
    pub(crate) access: Access,
}

impl ModuleFacade {
    pub(crate) fn bind(
        store: SharedStore,
        module: Arc<ModuleDescriptor>,
        access: Access,
    ) -> HandlerResult<Self> {
        ensure_wired(store.as_ref(), &module)?;
        Ok(Self {
            store,
            module,
            access,
        })
    }

    /// Namespace of the module this handle is bound to.
    pub fn namespace(&self) -> &Namespace {
        self.module.namespace()
    }

    /// The descriptor this facade is bound to.
    pub fn descriptor(&self) -> &Arc<ModuleDescriptor> {
        &self.module
    }

    /// True if writes through this facade are rejected.
    pub fn is_read_only(&self) -> bool {
        self.access == Access::ReadOnly
    }

    /// Current value at `namespace.field` in the state tree.
    ///
    /// Any key of the live slice is readable, including fields a mutator
    /// added after registration, and so is the slice of a child module
    /// nested under `field`. A declared field that is absent reads as
    /// `null`; anything else is [`StoreError::UnknownMember`].
    pub fn state(&self, field: &str) -> HandlerResult {
        let namespace = self.module.namespace();
        if let Some(value) = self.store.state_slice(namespace)?.remove(field) {
            return Ok(value);
        }
        if let Some(nested) = nested_state(&self.store.root_state(), namespace, field) {
            return Ok(nested);
        }
        if self.module.has_state_field(field) {
            return Ok(Value::Null);
        }
        Err(self.module.unknown("state field", field))
    }

    /// Decode a state field into `T`.
    pub fn state_as<T: DeserializeOwned>(&self, field: &str) -> HandlerResult<T> {
        Ok(serde_json::from_value(self.state(field)?)?)
    }

    /// Current value of a getter.
    pub fn get(&self, name: &str) -> HandlerResult {
        let key = self.module.getter_key(name)?;
        read_getter(self.store.as_ref(), key)
    }

    /// Decode a getter value into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> HandlerResult<T> {
        Ok(serde_json::from_value(self.get(name)?)?)
    }

    /// A bound committer for a mutator.
    pub fn mutator(&self, name: &str) -> HandlerResult<Committer> {
        Ok(Committer {
            store: Arc::clone(&self.store),
            key: self.module.mutator_key(name)?.to_string(),
            access: self.access,
        })
    }

    /// Commit `payload` through a mutator immediately.
    pub fn set(&self, name: &str, payload: impl Into<Value>) -> HandlerResult<()> {
        self.mutator(name)?.call(payload.into())
    }

    /// A bound dispatcher for an action.
    pub fn action(&self, name: &str) -> HandlerResult<Dispatcher> {
        Ok(Dispatcher {
            store: Arc::clone(&self.store),
            key: self.module.action_key(name)?.to_string(),
            access: self.access,
        })
    }

    /// Dispatch an action and return its eventual result.
    pub fn dispatch(&self, name: &str, payload: impl Into<Value>) -> BoxFuture<'static, HandlerResult> {
        match self.action(name) {
            Ok(dispatcher) => dispatcher.call(payload.into()),
            Err(err) => Box::pin(future::ready(Err(err))),
        }
    }
}

impl HasStore for ModuleFacade {
    fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }
}

impl fmt::Debug for ModuleFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleFacade")
            .field("namespace", &self.module.namespace().display_name())
            .field("access", &self.access)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassDef, ModuleOptions};
    use crate::testing::MemoryStore;
    use serde_json::json;

    fn counter(namespace: &str) -> Arc<ModuleDescriptor> {
        ClassDef::new("Counter")
            .field("test", 123)
            .getter("double", |ctx| Ok(json!(ctx.state_as::<i64>("test")? * 2)))
            .setter("setTest", |s, v| {
                s.set("test", v);
                Ok(())
            })
            .action("bump", |ctx, v| async move {
                let by = v.as_i64().unwrap_or(1);
                let current = ctx.state_as::<i64>("test")?;
                ctx.commit("setTest", json!(current + by))?;
                ctx.state("test")
            })
            .build(namespace)
    }

    #[test]
    fn test_state_and_getter_follow_commits() {
        let module = counter("");
        let store = MemoryStore::shared(&module);
        let facade = use_module(&module, &store).unwrap();
        assert_eq!(facade.state("test").unwrap(), json!(123));
        assert_eq!(facade.get("double").unwrap(), json!(246));

        facade.set("setTest", 10).unwrap();
        assert_eq!(facade.state("test").unwrap(), json!(10));
        assert_eq!(facade.get("double").unwrap(), json!(20));
    }

    #[test]
    fn test_commit_uses_qualified_key() {
        let module = counter("cart/items");
        let parent = ClassDef::new("Root").build_with("", ModuleOptions::new().child(Arc::clone(&module)));
        let store = MemoryStore::shared(&parent);
        let committer = use_module(&module, &store).unwrap().mutator("setTest").unwrap();
        assert_eq!(committer.key(), "cart/items/setTest");
        committer.call(json!(5)).unwrap();
        assert_eq!(store.state_field(module.namespace(), "test").unwrap(), json!(5));
    }

    #[tokio::test]
    async fn test_dispatch_through_facade() {
        let module = counter("counter");
        let store = MemoryStore::shared(&module);
        let facade = use_module(&module, &store).unwrap();
        let result = facade.dispatch("bump", 4).await.unwrap();
        assert_eq!(result, json!(127));
        assert_eq!(facade.state_as::<i64>("test").unwrap(), 127);
    }

    #[test]
    fn test_not_wired() {
        let registered = counter("counter");
        let stranger = counter("elsewhere");
        let store = MemoryStore::shared(&registered);
        let err = use_module(&stranger, &store).unwrap_err();
        assert!(matches!(err, StoreError::NotWired { namespace } if namespace == "elsewhere"));
    }

    #[test]
    fn test_facades_are_independent_but_equivalent() {
        let module = counter("");
        let store = MemoryStore::shared(&module);
        let first = use_module(&module, &store).unwrap();
        let second = use_module(&module, &store).unwrap();
        first.set("setTest", 7).unwrap();
        drop(first);
        assert_eq!(second.state("test").unwrap(), json!(7));
        let third = use_module(&module, &store).unwrap();
        assert_eq!(third.get("double").unwrap(), second.get("double").unwrap());
    }

    #[test]
    fn test_state_reads_fields_added_by_mutators() {
        let module = ClassDef::new("List")
            .field("items", json!([]))
            .setter("setLast", |s, v| {
                s.set("last", v);
                Ok(())
            })
            .build("");
        let store = MemoryStore::shared(&module);
        let facade = use_module(&module, &store).unwrap();
        assert!(matches!(
            facade.state("last"),
            Err(StoreError::UnknownMember { .. })
        ));
        facade.set("setLast", 5).unwrap();
        assert_eq!(facade.state("last").unwrap(), json!(5));
        assert_eq!(facade.state("items").unwrap(), json!([]));
    }

    #[test]
    fn test_unknown_state_field() {
        let module = counter("");
        let store = MemoryStore::shared(&module);
        let err = use_module(&module, &store).unwrap().state("nope").unwrap_err();
        assert!(matches!(err, StoreError::UnknownMember { kind: "state field", .. }));
    }

    #[tokio::test]
    async fn test_read_only_facade_rejects_writes() {
        let module = counter("");
        let store = MemoryStore::shared(&module);
        let facade = ModuleFacade::bind(store.clone(), Arc::clone(&module), Access::ReadOnly).unwrap();
        assert!(facade.is_read_only());
        assert!(matches!(facade.set("setTest", 1), Err(StoreError::ReadOnly { .. })));
        assert!(matches!(
            facade.dispatch("bump", 1).await,
            Err(StoreError::ReadOnly { .. })
        ));
        assert_eq!(facade.state("test").unwrap(), json!(123));
    }
}
