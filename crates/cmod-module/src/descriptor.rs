//! # Module Descriptors
//!
//! The portable, immutable artifact built once per class: a state template,
//! role tables keyed by member name, and the child modules registered below
//! it. A descriptor never holds live state. The backing store it is
//! registered into owns the state; descriptors only know how to evaluate a
//! getter, apply a mutator or start an action against that store.
//!
//! Fully qualified routing keys (`namespace/name`) are computed once at
//! build time and stored beside each table entry.

use std::fmt;
use std::sync::Arc;

use futures::future;
use serde::Serialize;
use serde_json::Value;

use cmod_core::{BoxFuture, HandlerResult, Namespace, SharedStore, StateMap, StoreError};

use crate::context::{ActionContext, GetterContext};
use crate::member::{ActionFn, GetterFn, HelperFn, MemberDescriptor, MemberShape, MutatorFn, Role};
use crate::state::StateSlice;
use crate::table::MemberTable;

/// An excluded member as it is reached from a context.
#[derive(Clone)]
pub(crate) enum Helper {
    /// A plain synchronous method, called with a helper receiver.
    Method(HelperFn),
    /// The read half of an accessor, evaluated like a getter.
    Getter(GetterFn),
    /// An asynchronous method, awaited from actions only.
    Async(ActionFn),
    /// A data member that is not part of state.
    Value(Value),
}

/// A classified, namespaced module definition.
pub struct ModuleDescriptor {
    name: String,
    namespace: Namespace,
    template: StateMap,
    getters: MemberTable<GetterFn>,
    mutators: MemberTable<MutatorFn>,
    actions: MemberTable<ActionFn>,
    helpers: MemberTable<Helper>,
    references: MemberTable<Arc<ModuleDescriptor>>,
    children: MemberTable<Arc<ModuleDescriptor>>,
    members: Vec<MemberDescriptor>,
}

impl ModuleDescriptor {
    pub(crate) fn assemble(
        name: String,
        namespace: Namespace,
        members: Vec<MemberDescriptor>,
        children: Vec<Arc<ModuleDescriptor>>,
    ) -> Self {
        let mut descriptor = Self {
            name,
            namespace,
            template: StateMap::new(),
            getters: MemberTable::default(),
            mutators: MemberTable::default(),
            actions: MemberTable::default(),
            helpers: MemberTable::default(),
            references: MemberTable::default(),
            children: MemberTable::default(),
            members: Vec::new(),
        };

        for member in &members {
            let key = descriptor.namespace.qualify(&member.name);
            match (&member.role, &member.shape) {
                (Some(Role::State), MemberShape::Field { value, .. }) => {
                    descriptor.template.insert(member.name.clone(), value.clone());
                }
                (Some(Role::Getter), MemberShape::Accessor { get: Some(get), .. }) => {
                    descriptor.getters.upsert(&member.name, key, Arc::clone(get));
                }
                (Some(Role::Mutator), MemberShape::Accessor { set: Some(set), .. })
                | (Some(Role::Mutator), MemberShape::Generator(set)) => {
                    descriptor.mutators.upsert(&member.name, key, Arc::clone(set));
                }
                (Some(Role::Action), MemberShape::Async(body)) => {
                    descriptor.actions.upsert(&member.name, key, Arc::clone(body));
                }
                // Excluded members stay reachable from contexts as helpers.
                (None, MemberShape::Method(body)) => {
                    descriptor
                        .helpers
                        .upsert(&member.name, key, Helper::Method(Arc::clone(body)));
                }
                (None, MemberShape::Accessor { get: Some(get), .. }) => {
                    descriptor
                        .helpers
                        .upsert(&member.name, key, Helper::Getter(Arc::clone(get)));
                }
                (None, MemberShape::Async(body)) => {
                    descriptor
                        .helpers
                        .upsert(&member.name, key, Helper::Async(Arc::clone(body)));
                }
                (None, MemberShape::Field { value, .. }) => {
                    descriptor
                        .helpers
                        .upsert(&member.name, key, Helper::Value(value.clone()));
                }
                (None, MemberShape::ModuleRef(target)) => {
                    descriptor
                        .references
                        .upsert(&member.name, key, Arc::clone(target));
                }
                // Write-only reserved accessors and reserved generators.
                _ => {}
            }
        }

        for child in children {
            let path = child.namespace.path();
            if descriptor.children.upsert(&path, path.clone(), child) {
                tracing::warn!(
                    module = %descriptor.namespace,
                    child = %path,
                    "duplicate child namespace, keeping the last declaration"
                );
            }
        }

        descriptor.members = members;
        descriptor
    }

    // ─── Identity ───────────────────────────────────────────────────────

    /// Class name the descriptor was built from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved namespace the module is registered at.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Every member of the flattened class with its inferred role.
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    // ─── State ──────────────────────────────────────────────────────────

    /// A fresh deep copy of the state template.
    pub fn state_factory(&self) -> StateMap {
        self.template.clone()
    }

    /// Declared state field names, sorted.
    pub fn state_fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.template.keys().map(String::as_str)
    }

    /// True if `field` is declared in the state template.
    pub fn has_state_field(&self, field: &str) -> bool {
        self.template.contains_key(field)
    }

    // ─── Role tables ────────────────────────────────────────────────────

    /// Getter names in declaration order, ancestors first.
    pub fn getter_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.getters.names()
    }

    /// Mutator names in declaration order, ancestors first.
    pub fn mutator_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.mutators.names()
    }

    /// Action names in declaration order, ancestors first.
    pub fn action_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.actions.names()
    }

    /// Names reachable through `helper(name)` from contexts.
    pub fn helper_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.helpers.names()
    }

    /// True if `name` is routed as a getter.
    pub fn has_getter(&self, name: &str) -> bool {
        self.getters.contains(name)
    }

    /// True if `name` is routed as a mutator.
    pub fn has_mutator(&self, name: &str) -> bool {
        self.mutators.contains(name)
    }

    /// True if `name` is routed as an action.
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains(name)
    }

    /// Fully qualified key of a getter.
    pub fn getter_key(&self, name: &str) -> HandlerResult<&str> {
        self.getters
            .get(name)
            .map(|e| e.key.as_str())
            .ok_or_else(|| self.unknown(Role::Getter.as_str(), name))
    }

    /// Fully qualified key of a mutator.
    pub fn mutator_key(&self, name: &str) -> HandlerResult<&str> {
        self.mutators
            .get(name)
            .map(|e| e.key.as_str())
            .ok_or_else(|| self.unknown(Role::Mutator.as_str(), name))
    }

    /// Fully qualified key of an action.
    pub fn action_key(&self, name: &str) -> HandlerResult<&str> {
        self.actions
            .get(name)
            .map(|e| e.key.as_str())
            .ok_or_else(|| self.unknown(Role::Action.as_str(), name))
    }

    /// Every routable member as `(role, name, qualified key)`: getters,
    /// then mutators, then actions.
    pub fn routes(&self) -> impl Iterator<Item = (Role, &str, &str)> + '_ {
        let getters = self.getters.iter().map(|e| (Role::Getter, &e.name, &e.key));
        let mutators = self.mutators.iter().map(|e| (Role::Mutator, &e.name, &e.key));
        let actions = self.actions.iter().map(|e| (Role::Action, &e.name, &e.key));
        getters
            .chain(mutators)
            .chain(actions)
            .map(|(role, name, key)| (role, name.as_str(), key.as_str()))
    }

    pub(crate) fn helper(&self, name: &str) -> HandlerResult<Helper> {
        self.helpers
            .get(name)
            .map(|e| e.value.clone())
            .ok_or_else(|| self.unknown("helper", name))
    }

    /// Value of a data member excluded from state: a read-only field or a
    /// reserved writable one.
    pub(crate) fn constant(&self, name: &str) -> HandlerResult<Value> {
        match self.helpers.get(name).map(|e| &e.value) {
            Some(Helper::Value(value)) => Ok(value.clone()),
            _ => Err(self.unknown("constant", name)),
        }
    }

    pub(crate) fn async_helper(&self, name: &str) -> StoreError {
        StoreError::AsyncHelper {
            namespace: self.namespace.display_name(),
            name: name.to_string(),
        }
    }

    /// The module a named reference points at.
    pub fn reference(&self, name: &str) -> HandlerResult<&Arc<ModuleDescriptor>> {
        self.references
            .get(name)
            .map(|e| &e.value)
            .ok_or_else(|| self.unknown("module reference", name))
    }

    /// Child modules keyed by their own namespace path.
    pub fn children(&self) -> impl Iterator<Item = &Arc<ModuleDescriptor>> + '_ {
        self.children.iter().map(|e| &e.value)
    }

    pub(crate) fn unknown(&self, kind: &'static str, name: &str) -> StoreError {
        StoreError::UnknownMember {
            namespace: self.namespace.display_name(),
            kind,
            name: name.to_string(),
        }
    }

    // ─── Invocation ─────────────────────────────────────────────────────

    /// Evaluate a getter against the live state of `store`.
    pub fn evaluate_getter(self: &Arc<Self>, name: &str, store: SharedStore) -> HandlerResult {
        let entry = self
            .getters
            .get(name)
            .ok_or_else(|| self.unknown(Role::Getter.as_str(), name))?;
        tracing::trace!(key = %entry.key, "evaluating getter");
        let ctx = GetterContext::new(store, Arc::clone(self))?;
        (entry.value)(&ctx)
    }

    /// Apply a mutator to a state slice in place.
    pub fn apply_mutator(
        &self,
        name: &str,
        state: &mut StateSlice,
        payload: Value,
    ) -> HandlerResult<()> {
        let entry = self
            .mutators
            .get(name)
            .ok_or_else(|| self.unknown(Role::Mutator.as_str(), name))?;
        (entry.value)(state, payload)
    }

    /// Start an action with a fresh action context.
    pub fn invoke_action(
        self: &Arc<Self>,
        name: &str,
        store: SharedStore,
        payload: Value,
    ) -> BoxFuture<'static, HandlerResult> {
        let body = match self.actions.get(name) {
            Some(entry) => Arc::clone(&entry.value),
            None => {
                return Box::pin(future::ready(Err(
                    self.unknown(Role::Action.as_str(), name)
                )))
            }
        };
        match ActionContext::new(store, Arc::clone(self)) {
            Ok(ctx) => body(ctx, payload),
            Err(err) => Box::pin(future::ready(Err(err))),
        }
    }

    // ─── Reporting ──────────────────────────────────────────────────────

    /// Serializable overview of the classified tables, children included.
    pub fn summary(&self) -> ModuleSummary {
        ModuleSummary {
            name: self.name.clone(),
            namespace: self.namespace.path(),
            state: self.template.clone(),
            getters: self.getters.names().map(str::to_string).collect(),
            mutators: self.mutators.names().map(str::to_string).collect(),
            actions: self.actions.names().map(str::to_string).collect(),
            helpers: self.helpers.names().map(str::to_string).collect(),
            references: self.references.names().map(str::to_string).collect(),
            excluded: self
                .members
                .iter()
                .filter(|m| m.role.is_none())
                .map(|m| m.name.clone())
                .collect(),
            children: self.children().map(|c| c.summary()).collect(),
        }
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("namespace", &self.namespace.display_name())
            .field("state", &self.template)
            .field("getters", &self.getters.names().collect::<Vec<_>>())
            .field("mutators", &self.mutators.names().collect::<Vec<_>>())
            .field("actions", &self.actions.names().collect::<Vec<_>>())
            .field("children", &self.children.len())
            .finish()
    }
}

/// What `cmod inspect` prints for one module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSummary {
    /// Class name.
    pub name: String,
    /// Joined namespace path, empty for the root.
    pub namespace: String,
    /// Initial state template.
    pub state: StateMap,
    /// Routed getter names.
    pub getters: Vec<String>,
    /// Routed mutator names.
    pub mutators: Vec<String>,
    /// Routed action names.
    pub actions: Vec<String>,
    /// Excluded members reachable as helpers.
    pub helpers: Vec<String>,
    /// Module reference names.
    pub references: Vec<String>,
    /// Every member without a role.
    pub excluded: Vec<String>,
    /// Summaries of child modules.
    pub children: Vec<ModuleSummary>,
}
