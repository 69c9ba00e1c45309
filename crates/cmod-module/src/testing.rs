//! Minimal in-memory backing store for unit tests of this crate.
//!
//! Routes qualified keys by scanning the registered descriptors. The full
//! store with registration checks and subscribers lives in `cmod-store`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use cmod_core::{
    BoxFuture, HandlerResult, Namespace, Services, SharedStore, StateMap, StoreError, StoreLike,
};

use crate::descriptor::ModuleDescriptor;
use crate::state::StateSlice;

#[derive(Clone)]
pub(crate) struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    modules: HashMap<Namespace, Arc<ModuleDescriptor>>,
    state: RwLock<HashMap<Namespace, StateMap>>,
    services: Services,
}

impl MemoryStore {
    pub(crate) fn shared(root: &Arc<ModuleDescriptor>) -> SharedStore {
        Self::with_services(root, Services::new())
    }

    pub(crate) fn with_services(root: &Arc<ModuleDescriptor>, services: Services) -> SharedStore {
        let mut modules = HashMap::new();
        let mut state = HashMap::new();
        let mut pending = vec![Arc::clone(root)];
        while let Some(module) = pending.pop() {
            pending.extend(module.children().cloned());
            state.insert(module.namespace().clone(), module.state_factory());
            modules.insert(module.namespace().clone(), module);
        }
        Arc::new(Self {
            inner: Arc::new(Inner {
                modules,
                state: RwLock::new(state),
                services,
            }),
        })
    }

    fn route(
        &self,
        key: &str,
        has: impl Fn(&ModuleDescriptor, &str) -> bool,
    ) -> Option<(Arc<ModuleDescriptor>, String)> {
        self.inner.modules.values().find_map(|module| {
            let name = match key.rsplit_once('/') {
                Some((ns, name)) if ns == module.namespace().path() => name,
                None if module.namespace().is_root() => key,
                _ => return None,
            };
            has(&**module, name).then(|| (Arc::clone(module), name.to_string()))
        })
    }

    fn miss(kind: &'static str, key: &str) -> StoreError {
        StoreError::UnknownKey {
            kind,
            key: key.to_string(),
        }
    }
}

impl StoreLike for MemoryStore {
    fn has_module(&self, namespace: &Namespace) -> bool {
        self.inner.modules.contains_key(namespace)
    }

    fn state_slice(&self, namespace: &Namespace) -> HandlerResult<StateMap> {
        self.inner
            .state
            .read()
            .get(namespace)
            .cloned()
            .ok_or_else(|| StoreError::NotWired {
                namespace: namespace.display_name(),
            })
    }

    fn root_state(&self) -> Value {
        let state = self.inner.state.read();
        let mut root = serde_json::Map::new();
        for (namespace, slice) in state.iter() {
            root.insert(namespace.path(), Value::Object(slice.clone()));
        }
        Value::Object(root)
    }

    fn getter(&self, key: &str) -> HandlerResult {
        let (module, name) = self
            .route(key, |m, n| m.has_getter(n))
            .ok_or_else(|| Self::miss("getter", key))?;
        module.evaluate_getter(&name, Arc::new(self.clone()))
    }

    fn commit(&self, key: &str, payload: Value) -> HandlerResult<()> {
        let (module, name) = self
            .route(key, |m, n| m.has_mutator(n))
            .ok_or_else(|| Self::miss("mutator", key))?;
        let mut state = self.inner.state.write();
        let slice = state.entry(module.namespace().clone()).or_default();
        let mut working = StateSlice::new(slice.clone());
        module.apply_mutator(&name, &mut working, payload)?;
        *slice = working.into_inner();
        Ok(())
    }

    fn dispatch(&self, key: &str, payload: Value) -> BoxFuture<'static, HandlerResult> {
        match self.route(key, |m, n| m.has_action(n)) {
            Some((module, name)) => module.invoke_action(&name, Arc::new(self.clone()), payload),
            None => Box::pin(futures::future::ready(Err(Self::miss("action", key)))),
        }
    }

    fn services(&self) -> &Services {
        &self.inner.services
    }
}
