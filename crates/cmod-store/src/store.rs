//! # Reference Store
//!
//! An in-memory [`StoreLike`] engine. One `Store` is one activation
//! context: it owns a state slice per registered module and routes every
//! qualified key through the tables built by the registry.
//!
//! ## Concurrency
//!
//! State sits behind a `parking_lot::RwLock`. A commit takes the write
//! lock for exactly one mutator run; getters and actions never run under
//! the lock, so they may freely re-enter the store. Because no lock is held
//! across an `.await`, the store works on multi-threaded and current-thread
//! runtimes alike.
//!
//! ## Failed commits
//!
//! The mutator runs against a copy of the slice. The copy replaces the live
//! slice only when the mutator returns `Ok`, so a failing mutator leaves
//! state untouched and notifies no subscriber.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use futures::future;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use cmod_core::{
    BoxFuture, CmodConfig, HandlerResult, HasStore, Namespace, RegistrationError, Services,
    SharedStore, StateMap, StoreError, StoreLike,
};
use cmod_module::{ModuleDescriptor, StateSlice};

use crate::registry::Registry;
use crate::tree::StateTree;

/// A successful commit, as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitRecord {
    /// Qualified mutator key.
    pub key: String,
    /// Payload the mutator was applied with.
    pub payload: Value,
}

type Subscriber = Arc<dyn Fn(&CommitRecord) + Send + Sync>;

struct Inner {
    root: Arc<ModuleDescriptor>,
    registry: Registry,
    state: RwLock<StateTree>,
    subscribers: RwLock<Vec<Subscriber>>,
    services: Services,
    config: CmodConfig,
}

/// Shared handle to one store instance.
///
/// Cheaply cloneable via `Arc`; all clones share the same state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

/// Configures and registers a [`Store`].
pub struct StoreBuilder {
    root: Arc<ModuleDescriptor>,
    services: Services,
    config: CmodConfig,
    initial_state: Option<Value>,
}

impl StoreBuilder {
    /// Inject a service reachable from actions and action helpers.
    pub fn service<T: Any + Send + Sync>(mut self, service: T) -> Self {
        self.services.insert(service);
        self
    }

    /// Replace the registration configuration.
    pub fn config(mut self, config: CmodConfig) -> Self {
        self.config = config;
        self
    }

    /// Start from a snapshot previously taken with [`Store::snapshot`]
    /// instead of the class templates.
    pub fn initial_state(mut self, snapshot: Value) -> Self {
        self.initial_state = Some(snapshot);
        self
    }

    /// Register the descriptor tree.
    pub fn build(self) -> Result<Store, RegistrationError> {
        let registry = Registry::build(&self.root, &self.config.store)?;
        let mut tree = registry.initial_tree();
        if let Some(snapshot) = &self.initial_state {
            tree.hydrate(snapshot)?;
            tracing::debug!("hydrated initial state from snapshot");
        }
        Ok(Store {
            inner: Arc::new(Inner {
                root: self.root,
                registry,
                state: RwLock::new(tree),
                subscribers: RwLock::new(Vec::new()),
                services: self.services,
                config: self.config,
            }),
        })
    }
}

impl Store {
    /// Start configuring a store for the tree below `root`.
    pub fn builder(root: Arc<ModuleDescriptor>) -> StoreBuilder {
        StoreBuilder {
            root,
            services: Services::new(),
            config: CmodConfig::default(),
            initial_state: None,
        }
    }

    /// Register `root` with default configuration and no services.
    pub fn new(root: Arc<ModuleDescriptor>) -> Result<Self, RegistrationError> {
        Self::builder(root).build()
    }

    /// The registered root descriptor.
    pub fn root(&self) -> &Arc<ModuleDescriptor> {
        &self.inner.root
    }

    /// The configuration the store was built with.
    pub fn config(&self) -> &CmodConfig {
        &self.inner.config
    }

    /// Registered namespaces, sorted.
    pub fn namespaces(&self) -> Vec<Namespace> {
        self.inner.registry.namespaces().cloned().collect()
    }

    /// The nested state tree. Feed it to [`StoreBuilder::initial_state`]
    /// to start another store from the same state.
    pub fn snapshot(&self) -> Value {
        self.inner.state.read().to_value()
    }

    /// Observe every successful commit.
    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(&CommitRecord) + Send + Sync + 'static,
    {
        self.inner.subscribers.write().push(Arc::new(observer));
    }

    fn shared(&self) -> SharedStore {
        Arc::new(self.clone())
    }

    fn notify(&self, record: &CommitRecord) {
        // Observers run outside the lock and may subscribe or commit.
        let subscribers: Vec<Subscriber> = self.inner.subscribers.read().clone();
        for subscriber in subscribers {
            subscriber(record);
        }
    }

    fn miss(kind: &'static str, key: &str) -> StoreError {
        tracing::warn!(%key, kind, "no route for key");
        StoreError::UnknownKey {
            kind,
            key: key.to_string(),
        }
    }
}

impl StoreLike for Store {
    fn has_module(&self, namespace: &Namespace) -> bool {
        self.inner.registry.contains(namespace)
    }

    fn state_slice(&self, namespace: &Namespace) -> HandlerResult<StateMap> {
        self.inner
            .state
            .read()
            .slice(namespace)
            .cloned()
            .ok_or_else(|| StoreError::NotWired {
                namespace: namespace.display_name(),
            })
    }

    fn state_field(&self, namespace: &Namespace, field: &str) -> HandlerResult {
        let state = self.inner.state.read();
        let slice = state.slice(namespace).ok_or_else(|| StoreError::NotWired {
            namespace: namespace.display_name(),
        })?;
        Ok(slice.get(field).cloned().unwrap_or(Value::Null))
    }

    fn root_state(&self) -> Value {
        self.snapshot()
    }

    fn getter(&self, key: &str) -> HandlerResult {
        let route = self
            .inner
            .registry
            .getter(key)
            .ok_or_else(|| Self::miss("getter", key))?;
        route.module.evaluate_getter(&route.name, self.shared())
    }

    fn commit(&self, key: &str, payload: Value) -> HandlerResult<()> {
        let route = self
            .inner
            .registry
            .mutator(key)
            .ok_or_else(|| Self::miss("mutator", key))?;
        {
            let mut state = self.inner.state.write();
            let namespace = route.module.namespace();
            let slice = state.slice_mut(namespace).ok_or_else(|| StoreError::NotWired {
                namespace: namespace.display_name(),
            })?;
            let mut working = StateSlice::new(slice.clone());
            if let Err(err) = route.module.apply_mutator(&route.name, &mut working, payload.clone()) {
                tracing::debug!(%key, error = %err, "commit aborted");
                return Err(err);
            }
            *slice = working.into_inner();
        }
        tracing::debug!(%key, "committed");
        self.notify(&CommitRecord {
            key: key.to_string(),
            payload,
        });
        Ok(())
    }

    fn dispatch(&self, key: &str, payload: Value) -> BoxFuture<'static, HandlerResult> {
        let Some(route) = self.inner.registry.action(key) else {
            return Box::pin(future::ready(Err(Self::miss("action", key))));
        };
        let span = tracing::debug_span!("dispatch", %key);
        route
            .module
            .invoke_action(&route.name, self.shared(), payload)
            .instrument(span)
            .boxed()
    }

    fn services(&self) -> &Services {
        &self.inner.services
    }
}

impl HasStore for Store {
    fn store(&self) -> SharedStore {
        self.shared()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("root", &self.inner.root.namespace().display_name())
            .field("modules", &self.inner.registry.namespaces().count())
            .field("services", &self.inner.services)
            .finish()
    }
}
