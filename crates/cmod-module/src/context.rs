//! # Execution Contexts
//!
//! The explicit receivers handed to getter, action and helper bodies. Each
//! is built fresh for one invocation and dropped when it returns. None of
//! them caches store values beyond what is documented per method.
//!
//! | Context          | State           | Getters | Mutators/Actions | Helpers receive |
//! |------------------|-----------------|---------|------------------|-----------------|
//! | [`GetterContext`]| slice snapshot  | live    | none             | minimal         |
//! | [`ActionContext`]| live, per read  | live    | bound invokers   | ambient         |
//!
//! Members excluded from routing (plain methods, reserved-name accessors,
//! async methods and data fields) are reachable from every context through
//! `helper(name)`. Asynchronous helpers can only be awaited from actions.
//!
//! Building a context never writes to the store.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use futures::future;
use serde::de::DeserializeOwned;
use serde_json::Value;

use cmod_core::{BoxFuture, HandlerResult, HasStore, Namespace, SharedStore, StateMap, StoreError};

use crate::descriptor::{Helper, ModuleDescriptor};
use crate::facade::{ensure_wired, read_getter, Access, Committer, Dispatcher, ModuleFacade};

fn field_of(state: &StateMap, field: &str) -> Value {
    state.get(field).cloned().unwrap_or(Value::Null)
}

// ─── Getter context ─────────────────────────────────────────────────────

/// The receiver of a getter body.
///
/// Local state is the slice as it was when the context was built; local
/// getters are re-read from the store on every call. There is no way to
/// commit or dispatch from here.
pub struct GetterContext {
    store: SharedStore,
    module: Arc<ModuleDescriptor>,
    state: StateMap,
}

impl GetterContext {
    pub(crate) fn new(store: SharedStore, module: Arc<ModuleDescriptor>) -> HandlerResult<Self> {
        ensure_wired(store.as_ref(), &module)?;
        let state = store.state_slice(module.namespace())?;
        Ok(Self {
            store,
            module,
            state,
        })
    }

    /// Namespace of the module this handle is bound to.
    pub fn namespace(&self) -> &Namespace {
        self.module.namespace()
    }

    /// A local state field. Absent fields read as `null`.
    pub fn state(&self, field: &str) -> Value {
        field_of(&self.state, field)
    }

    /// Decode a state field into `T`.
    pub fn state_as<T: DeserializeOwned>(&self, field: &str) -> HandlerResult<T> {
        Ok(serde_json::from_value(self.state(field))?)
    }

    /// A local getter.
    pub fn getter(&self, name: &str) -> HandlerResult {
        let key = self.module.getter_key(name)?;
        read_getter(self.store.as_ref(), key)
    }

    /// Decode a getter value into `T`.
    pub fn getter_as<T: DeserializeOwned>(&self, name: &str) -> HandlerResult<T> {
        Ok(serde_json::from_value(self.getter(name)?)?)
    }

    /// A read-only data field of the class.
    pub fn constant(&self, name: &str) -> HandlerResult {
        self.module.constant(name)
    }

    /// Invoke a helper. Methods get a receiver limited to state and
    /// getters; reserved getters are evaluated against this context.
    /// Asynchronous helpers fail with [`StoreError::AsyncHelper`].
    pub fn helper(&self, name: &str) -> HandlerResult {
        match self.module.helper(name)? {
            Helper::Method(body) => body(&HelperReceiver {
                store: Arc::clone(&self.store),
                module: Arc::clone(&self.module),
                scope: Scope::Minimal {
                    state: self.state.clone(),
                },
            }),
            Helper::Getter(body) => body(self),
            Helper::Value(value) => Ok(value),
            Helper::Async(_) => Err(self.module.async_helper(name)),
        }
    }

    /// A read-only facade of a referenced module.
    pub fn module(&self, reference: &str) -> HandlerResult<ModuleFacade> {
        let target = self.module.reference(reference)?;
        ModuleFacade::bind(Arc::clone(&self.store), Arc::clone(target), Access::ReadOnly)
    }

    /// A read-only facade of any module wired into the same store.
    pub fn use_module(&self, module: &Arc<ModuleDescriptor>) -> HandlerResult<ModuleFacade> {
        ModuleFacade::bind(Arc::clone(&self.store), Arc::clone(module), Access::ReadOnly)
    }

    /// The whole nested state tree.
    pub fn root_state(&self) -> Value {
        self.store.root_state()
    }

    /// A getter of any module, by qualified key.
    pub fn root_getter(&self, key: &str) -> HandlerResult {
        read_getter(self.store.as_ref(), key)
    }
}

impl fmt::Debug for GetterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetterContext")
            .field("namespace", &self.module.namespace().display_name())
            .field("state", &self.state)
            .finish()
    }
}

// ─── Action context ─────────────────────────────────────────────────────

/// The receiver of an action body.
///
/// Every state read goes to the store, so a read after an awaited nested
/// action observes whatever that action committed.
#[derive(Clone)]
pub struct ActionContext {
    store: SharedStore,
    module: Arc<ModuleDescriptor>,
}

impl ActionContext {
    pub(crate) fn new(store: SharedStore, module: Arc<ModuleDescriptor>) -> HandlerResult<Self> {
        ensure_wired(store.as_ref(), &module)?;
        Ok(Self { store, module })
    }

    /// Namespace of the module this handle is bound to.
    pub fn namespace(&self) -> &Namespace {
        self.module.namespace()
    }

    /// The current value of a local state field.
    pub fn state(&self, field: &str) -> HandlerResult {
        self.store.state_field(self.module.namespace(), field)
    }

    /// Decode a state field into `T`.
    pub fn state_as<T: DeserializeOwned>(&self, field: &str) -> HandlerResult<T> {
        Ok(serde_json::from_value(self.state(field)?)?)
    }

    /// The current value of a local getter.
    pub fn getter(&self, name: &str) -> HandlerResult {
        let key = self.module.getter_key(name)?;
        read_getter(self.store.as_ref(), key)
    }

    /// Decode a getter value into `T`.
    pub fn getter_as<T: DeserializeOwned>(&self, name: &str) -> HandlerResult<T> {
        Ok(serde_json::from_value(self.getter(name)?)?)
    }

    /// A local mutator as a bound committer.
    pub fn mutator(&self, name: &str) -> HandlerResult<Committer> {
        self.own().mutator(name)
    }

    /// Commit `payload` through a local mutator.
    pub fn commit(&self, name: &str, payload: impl Into<Value>) -> HandlerResult<()> {
        self.mutator(name)?.call(payload.into())
    }

    /// A local action as a bound dispatcher.
    pub fn action(&self, name: &str) -> HandlerResult<Dispatcher> {
        self.own().action(name)
    }

    /// Dispatch a local action.
    pub fn dispatch(&self, name: &str, payload: impl Into<Value>) -> BoxFuture<'static, HandlerResult> {
        match self.action(name) {
            Ok(dispatcher) => dispatcher.call(payload.into()),
            Err(err) => Box::pin(future::ready(Err(err))),
        }
    }

    /// A data member excluded from state, such as a read-only field.
    pub fn constant(&self, name: &str) -> HandlerResult {
        self.module.constant(name)
    }

    /// Invoke a helper without a payload. See [`Self::call_helper`].
    pub fn helper(&self, name: &str) -> BoxFuture<'static, HandlerResult> {
        self.call_helper(name, Value::Null)
    }

    /// Invoke a helper. Methods get the ambient receiver (store, services
    /// and writable module references); reserved getters get a fresh getter
    /// context; asynchronous helpers run with a clone of this context and
    /// `payload`.
    pub fn call_helper(&self, name: &str, payload: impl Into<Value>) -> BoxFuture<'static, HandlerResult> {
        let helper = match self.module.helper(name) {
            Ok(helper) => helper,
            Err(err) => return Box::pin(future::ready(Err(err))),
        };
        let result = match helper {
            Helper::Async(body) => return body(self.clone(), payload.into()),
            Helper::Method(body) => body(&HelperReceiver {
                store: Arc::clone(&self.store),
                module: Arc::clone(&self.module),
                scope: Scope::Ambient,
            }),
            Helper::Getter(body) => GetterContext::new(Arc::clone(&self.store), Arc::clone(&self.module))
                .and_then(|ctx| body(&ctx)),
            Helper::Value(value) => Ok(value),
        };
        Box::pin(future::ready(result))
    }

    /// A writable facade of a referenced module.
    pub fn module(&self, reference: &str) -> HandlerResult<ModuleFacade> {
        let target = self.module.reference(reference)?;
        ModuleFacade::bind(Arc::clone(&self.store), Arc::clone(target), Access::ReadWrite)
    }

    /// A writable facade of any module wired into the same store.
    pub fn use_module(&self, module: &Arc<ModuleDescriptor>) -> HandlerResult<ModuleFacade> {
        ModuleFacade::bind(Arc::clone(&self.store), Arc::clone(module), Access::ReadWrite)
    }

    /// An injected service.
    pub fn service<T: Any + Send + Sync>(&self) -> HandlerResult<Arc<T>> {
        self.store.services().require::<T>()
    }

    /// The whole nested state tree.
    pub fn root_state(&self) -> Value {
        self.store.root_state()
    }

    /// A getter of any module, by qualified key.
    pub fn root_getter(&self, key: &str) -> HandlerResult {
        read_getter(self.store.as_ref(), key)
    }

    fn own(&self) -> ModuleFacade {
        ModuleFacade {
            store: Arc::clone(&self.store),
            module: Arc::clone(&self.module),
            access: Access::ReadWrite,
        }
    }
}

impl HasStore for ActionContext {
    fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("namespace", &self.module.namespace().display_name())
            .finish()
    }
}

// ─── Helper receiver ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Scope {
    /// Called from a getter: state snapshot and getters only.
    Minimal { state: StateMap },
    /// Called from an action: the whole store.
    Ambient,
}

/// The receiver of a helper body.
///
/// From a getter the receiver is minimal: the getter's state snapshot,
/// getters and root reads. From an action it is ambient: live state,
/// injected services and writable module references.
pub struct HelperReceiver {
    store: SharedStore,
    module: Arc<ModuleDescriptor>,
    scope: Scope,
}

impl HelperReceiver {
    /// True when called from an action.
    pub fn is_ambient(&self) -> bool {
        matches!(self.scope, Scope::Ambient)
    }

    /// Namespace of the module this handle is bound to.
    pub fn namespace(&self) -> &Namespace {
        self.module.namespace()
    }

    /// A local state field: live from actions, the getter's snapshot
    /// otherwise.
    pub fn state(&self, field: &str) -> HandlerResult {
        match &self.scope {
            Scope::Minimal { state } => Ok(field_of(state, field)),
            Scope::Ambient => self.store.state_field(self.module.namespace(), field),
        }
    }

    /// Decode a state field into `T`.
    pub fn state_as<T: DeserializeOwned>(&self, field: &str) -> HandlerResult<T> {
        Ok(serde_json::from_value(self.state(field)?)?)
    }

    /// The current value of a local getter.
    pub fn getter(&self, name: &str) -> HandlerResult {
        let key = self.module.getter_key(name)?;
        read_getter(self.store.as_ref(), key)
    }

    /// A data member excluded from state, such as a read-only field.
    pub fn constant(&self, name: &str) -> HandlerResult {
        self.module.constant(name)
    }

    /// Another helper of the same module. Methods share this receiver;
    /// reserved getters see the same state this receiver does.
    pub fn helper(&self, name: &str) -> HandlerResult {
        match self.module.helper(name)? {
            Helper::Method(body) => body(self),
            Helper::Getter(body) => body(&self.getter_context()?),
            Helper::Value(value) => Ok(value),
            Helper::Async(_) => Err(self.module.async_helper(name)),
        }
    }

    fn getter_context(&self) -> HandlerResult<GetterContext> {
        match &self.scope {
            Scope::Minimal { state } => Ok(GetterContext {
                store: Arc::clone(&self.store),
                module: Arc::clone(&self.module),
                state: state.clone(),
            }),
            Scope::Ambient => GetterContext::new(Arc::clone(&self.store), Arc::clone(&self.module)),
        }
    }

    /// The whole nested state tree.
    pub fn root_state(&self) -> Value {
        self.store.root_state()
    }

    /// A getter of any module, by qualified key.
    pub fn root_getter(&self, key: &str) -> HandlerResult {
        read_getter(self.store.as_ref(), key)
    }

    /// An injected service. Only available to helpers called from actions.
    pub fn service<T: Any + Send + Sync>(&self) -> HandlerResult<Arc<T>> {
        match self.scope {
            Scope::Ambient => self.store.services().require::<T>(),
            Scope::Minimal { .. } => Err(StoreError::MissingService(std::any::type_name::<T>())),
        }
    }

    /// A facade of a referenced module, writable only from actions.
    pub fn module(&self, reference: &str) -> HandlerResult<ModuleFacade> {
        let target = self.module.reference(reference)?;
        ModuleFacade::bind(Arc::clone(&self.store), Arc::clone(target), self.access())
    }

    /// This helper's own module as a facade, writable only from actions.
    pub fn facade(&self) -> HandlerResult<ModuleFacade> {
        ModuleFacade::bind(Arc::clone(&self.store), Arc::clone(&self.module), self.access())
    }

    /// The backing store, when called from an action.
    pub fn store(&self) -> Option<SharedStore> {
        match self.scope {
            Scope::Ambient => Some(Arc::clone(&self.store)),
            Scope::Minimal { .. } => None,
        }
    }

    fn access(&self) -> Access {
        match self.scope {
            Scope::Ambient => Access::ReadWrite,
            Scope::Minimal { .. } => Access::ReadOnly,
        }
    }
}

impl fmt::Debug for HelperReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperReceiver")
            .field("namespace", &self.module.namespace().display_name())
            .field("scope", &self.scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassDef, ModuleOptions};
    use crate::facade::use_module;
    use crate::testing::MemoryStore;
    use cmod_core::Services;
    use parking_lot::Mutex;
    use serde_json::json;

    struct Api;

    impl Api {
        fn test(&self) -> i64 {
            123
        }
    }

    fn child() -> Arc<ModuleDescriptor> {
        ClassDef::new("Nested")
            .field("v", "x")
            .setter("setV", |s, v| {
                s.set("v", v);
                Ok(())
            })
            .getter("loud", |ctx| {
                Ok(json!(ctx.state_as::<String>("v")?.to_uppercase()))
            })
            .action("someAction", |ctx, v| async move {
                let log = ctx.service::<Mutex<Vec<String>>>()?;
                log.lock().push("child".into());
                ctx.commit("setV", v)?;
                Ok(json!("done"))
            })
            .build("nested")
    }

    fn parent(child: &Arc<ModuleDescriptor>) -> Arc<ModuleDescriptor> {
        ClassDef::new("Parent")
            .field("test", 123)
            .field("count", 0)
            .getter("double", |ctx| Ok(json!(ctx.state_as::<i64>("test")? * 2)))
            .getter("quadruple", |ctx| Ok(json!(ctx.getter_as::<i64>("double")? * 2)))
            .getter("formatted", |ctx| ctx.helper("format"))
            .getter("childLoud", |ctx| ctx.module("$nested")?.get("loud"))
            .getter("sneakyWrite", |ctx| {
                ctx.module("$nested")?.set("setV", "hacked")?;
                Ok(Value::Null)
            })
            .getter("sneakyService", |ctx| ctx.helper("fetch"))
            .setter("setTest", |s, v| {
                s.set("test", v);
                Ok(())
            })
            .generator("increment", |s, _v| {
                let count = s.get_as::<i64>("count")?;
                s.set("count", count + 1);
                Ok(())
            })
            .method("format", |r| Ok(json!(format!("test={}", r.state("test")?))))
            .method("fetch", |r| Ok(json!(r.service::<Api>()?.test())))
            .module_ref("$nested", Arc::clone(child))
            .action("readTwice", |ctx, _v| async move {
                let before = ctx.state("test")?;
                ctx.dispatch("write", 77).await?;
                let after = ctx.state("test")?;
                Ok(json!([before, after]))
            })
            .action("write", |ctx, v| async move {
                ctx.mutator("setTest")?.call(v)?;
                Ok(Value::Null)
            })
            .action("withChild", |ctx, _v| async move {
                let log = ctx.service::<Mutex<Vec<String>>>()?;
                log.lock().push("parent before".into());
                let result = ctx.module("$nested")?.dispatch("someAction", "y").await?;
                log.lock().push("parent after".into());
                Ok(result)
            })
            .action("viaHelper", |ctx, _v| async move { ctx.helper("fetch").await })
            .action("fails", |_ctx, _v| async move {
                Err(StoreError::handler("quota exceeded"))
            })
            .build_with("", ModuleOptions::new().child(Arc::clone(child)))
    }

    fn store() -> (SharedStore, Arc<ModuleDescriptor>, Arc<ModuleDescriptor>) {
        let child = child();
        let root = parent(&child);
        let mut services = Services::new();
        services.insert(Api);
        services.insert(Mutex::new(Vec::<String>::new()));
        (MemoryStore::with_services(&root, services), root, child)
    }

    #[test]
    fn test_getter_reads_getter_live() {
        let (store, root, _) = store();
        let facade = use_module(&root, &store).unwrap();
        assert_eq!(facade.get("quadruple").unwrap(), json!(492));
        facade.set("setTest", 1).unwrap();
        assert_eq!(facade.get("quadruple").unwrap(), json!(4));
    }

    #[test]
    fn test_getter_helper_sees_state() {
        let (store, root, _) = store();
        let facade = use_module(&root, &store).unwrap();
        assert_eq!(facade.get("formatted").unwrap(), json!("test=123"));
    }

    #[test]
    fn test_getter_reads_referenced_module() {
        let (store, root, _) = store();
        let facade = use_module(&root, &store).unwrap();
        assert_eq!(facade.get("childLoud").unwrap(), json!("X"));
    }

    #[test]
    fn test_getter_cannot_write_through_reference() {
        let (store, root, child) = store();
        let facade = use_module(&root, &store).unwrap();
        let err = facade.get("sneakyWrite").unwrap_err();
        assert!(matches!(err, StoreError::ReadOnly { .. }));
        assert_eq!(use_module(&child, &store).unwrap().state("v").unwrap(), json!("x"));
    }

    #[test]
    fn test_getter_helper_has_no_services() {
        let (store, root, _) = store();
        let err = use_module(&root, &store).unwrap().get("sneakyService").unwrap_err();
        assert!(matches!(err, StoreError::MissingService(_)));
    }

    #[test]
    fn test_generator_runs_to_completion() {
        let (store, root, _) = store();
        let facade = use_module(&root, &store).unwrap();
        facade.set("increment", Value::Null).unwrap();
        facade.set("increment", Value::Null).unwrap();
        assert_eq!(facade.state("count").unwrap(), json!(2));
    }

    #[tokio::test]
    async fn test_action_reads_are_live() {
        let (store, root, _) = store();
        let result = use_module(&root, &store)
            .unwrap()
            .dispatch("readTwice", Value::Null)
            .await
            .unwrap();
        assert_eq!(result, json!([123, 77]));
    }

    #[tokio::test]
    async fn test_nested_action_completes_before_parent_resumes() {
        let (store, root, child) = store();
        let result = use_module(&root, &store)
            .unwrap()
            .dispatch("withChild", Value::Null)
            .await
            .unwrap();
        assert_eq!(result, json!("done"));
        let log = store.services().require::<Mutex<Vec<String>>>().unwrap();
        assert_eq!(
            *log.lock(),
            vec!["parent before", "child", "parent after"]
        );
        assert_eq!(use_module(&child, &store).unwrap().state("v").unwrap(), json!("y"));
    }

    #[tokio::test]
    async fn test_action_helper_reaches_services() {
        let (store, root, _) = store();
        let result = use_module(&root, &store)
            .unwrap()
            .dispatch("viaHelper", Value::Null)
            .await
            .unwrap();
        assert_eq!(result, json!(123));
    }

    #[tokio::test]
    async fn test_action_failure_passes_through() {
        let (store, root, _) = store();
        let err = use_module(&root, &store)
            .unwrap()
            .dispatch("fails", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
        assert!(matches!(err, StoreError::Handler(_)));
    }

    #[tokio::test]
    async fn test_unknown_local_action() {
        let (store, root, _) = store();
        let ctx = ActionContext::new(store, root).unwrap();
        let err = ctx.dispatch("missing", Value::Null).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownMember { kind: "action", .. }));
    }

    #[test]
    fn test_context_requires_wiring() {
        let (store, _, _) = store();
        let stray = ClassDef::new("Stray").build("stray");
        assert!(matches!(
            GetterContext::new(Arc::clone(&store), Arc::clone(&stray)),
            Err(StoreError::NotWired { .. })
        ));
        assert!(matches!(
            ActionContext::new(store, stray),
            Err(StoreError::NotWired { .. })
        ));
    }

    fn reserved() -> Arc<ModuleDescriptor> {
        ClassDef::new("Person")
            .field("prename", "Jane")
            .field("lastname", "Doe")
            .field("_separator", " ")
            .getter("_full", |ctx| {
                let separator = ctx.constant("_separator")?;
                Ok(json!(format!(
                    "{}{}{}",
                    ctx.state_as::<String>("prename")?,
                    separator.as_str().unwrap_or_default(),
                    ctx.state_as::<String>("lastname")?
                )))
            })
            .action("$load", |ctx, payload| async move {
                let greeting = payload.as_str().unwrap_or("Hello").to_string();
                let full = ctx.helper("_full").await?;
                Ok(json!(format!("{greeting} {}", full.as_str().unwrap_or_default())))
            })
            .method("shout", |r| {
                Ok(json!(r.helper("_full")?.as_str().unwrap_or_default().to_uppercase()))
            })
            .getter("text", |ctx| ctx.helper("_full"))
            .getter("loud", |ctx| ctx.helper("shout"))
            .getter("eager", |ctx| ctx.helper("$load"))
            .action("run", |ctx, _v| async move { ctx.helper("$load").await })
            .action("greet", |ctx, _v| async move { ctx.call_helper("$load", "Hi").await })
            .action("separator", |ctx, _v| async move { ctx.helper("_separator").await })
            .build("")
    }

    #[test]
    fn test_reserved_getter_reachable_from_getters() {
        let module = reserved();
        let store = MemoryStore::shared(&module);
        let facade = use_module(&module, &store).unwrap();
        assert_eq!(facade.get("text").unwrap(), json!("Jane Doe"));
        assert_eq!(facade.get("loud").unwrap(), json!("JANE DOE"));
        assert!(module.routes().all(|(_, name, _)| !name.starts_with(['_', '$'])));
    }

    #[test]
    fn test_async_helper_is_not_callable_from_getters() {
        let module = reserved();
        let store = MemoryStore::shared(&module);
        let err = use_module(&module, &store).unwrap().get("eager").unwrap_err();
        assert!(matches!(err, StoreError::AsyncHelper { ref name, .. } if name == "$load"));
    }

    #[tokio::test]
    async fn test_reserved_async_helper_awaited_from_action() {
        let module = reserved();
        let store = MemoryStore::shared(&module);
        let facade = use_module(&module, &store).unwrap();
        assert_eq!(
            facade.dispatch("run", Value::Null).await.unwrap(),
            json!("Hello Jane Doe")
        );
        assert_eq!(
            facade.dispatch("greet", Value::Null).await.unwrap(),
            json!("Hi Jane Doe")
        );
    }

    #[tokio::test]
    async fn test_reserved_field_is_helper_not_state() {
        let module = reserved();
        let store = MemoryStore::shared(&module);
        let facade = use_module(&module, &store).unwrap();
        assert!(!module.has_state_field("_separator"));
        assert_eq!(
            facade.dispatch("separator", Value::Null).await.unwrap(),
            json!(" ")
        );
    }
}
