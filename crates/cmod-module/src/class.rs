//! # Class Definitions
//!
//! A [`ClassDef`] is the explicit declaration of a module class: the data
//! fields, accessors, procedures and references its author wrote, plus the
//! base classes it extends. It carries no roles. Roles are inferred by
//! [`crate::member::classify`] when the class is built into a
//! [`ModuleDescriptor`].
//!
//! ## Inheritance
//!
//! Bases are merged first, in declaration order, then the class's own
//! members. A later declaration of an existing name replaces the earlier
//! one in place, so exposed order is ancestor-first and an override keeps
//! the slot of the member it shadows.
//!
//! ## Getters are read-only
//!
//! A getter body receives a [`GetterContext`], which has no commit or
//! dispatch surface at all:
//!
//! ```compile_fail
//! use cmod_module::ClassDef;
//!
//! let _ = ClassDef::new("Counter").getter("sneaky", |ctx| {
//!     ctx.commit("setTest", serde_json::json!(1))?;
//!     Ok(serde_json::Value::Null)
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use cmod_core::{CmodConfig, HandlerResult, Namespace, RegistrationError, StoreError};

use crate::context::{ActionContext, GetterContext, HelperReceiver};
use crate::descriptor::ModuleDescriptor;
use crate::member::{MemberDescriptor, MemberShape};
use crate::state::StateSlice;
use crate::table::MemberTable;

/// Options applied when a class is built into a descriptor.
#[derive(Debug, Clone, Default)]
pub struct ModuleOptions {
    /// Child modules, registered below this module.
    pub children: Vec<Arc<ModuleDescriptor>>,
    /// Classification and namespace rules.
    pub config: CmodConfig,
}

impl ModuleOptions {
    /// No children and the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a child module.
    pub fn child(mut self, child: Arc<ModuleDescriptor>) -> Self {
        self.children.push(child);
        self
    }

    /// Replace the configuration.
    pub fn config(mut self, config: CmodConfig) -> Self {
        self.config = config;
        self
    }
}

/// A declared module class.
#[derive(Debug, Clone)]
pub struct ClassDef {
    name: String,
    bases: Vec<ClassDef>,
    members: Vec<(String, MemberShape)>,
}

impl ClassDef {
    /// Start an empty class.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Start a class whose data fields are the fields of a serialized value.
    ///
    /// The value must serialize to an object.
    pub fn from_template<T: Serialize>(name: impl Into<String>, template: &T) -> HandlerResult<Self> {
        let name = name.into();
        let Value::Object(fields) = serde_json::to_value(template)? else {
            return Err(StoreError::Registration(
                RegistrationError::InvalidInitialState { namespace: name },
            ));
        };
        let mut class = Self::new(name);
        for (field, value) in fields {
            class = class.field(field, value);
        }
        Ok(class)
    }

    /// The class name, used in logs and summaries.
    pub fn name(&self) -> &str {
        &self.name
    }

    // ─── Members ────────────────────────────────────────────────────────

    /// A writable data field.
    pub fn field(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.member(
            name,
            MemberShape::Field {
                value: value.into(),
                writable: true,
            },
        )
    }

    /// A read-only data field.
    pub fn constant(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.member(
            name,
            MemberShape::Field {
                value: value.into(),
                writable: false,
            },
        )
    }

    /// A read accessor.
    pub fn getter<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&GetterContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.member(
            name,
            MemberShape::Accessor {
                get: Some(Arc::new(body)),
                set: None,
            },
        )
    }

    /// A write accessor.
    pub fn setter<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut StateSlice, Value) -> HandlerResult<()> + Send + Sync + 'static,
    {
        self.member(
            name,
            MemberShape::Accessor {
                get: None,
                set: Some(Arc::new(body)),
            },
        )
    }

    /// A method explicitly marked as a mutation. Same shape as [`Self::setter`].
    pub fn mutation<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut StateSlice, Value) -> HandlerResult<()> + Send + Sync + 'static,
    {
        self.setter(name, body)
    }

    /// A generator-style procedure.
    pub fn generator<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut StateSlice, Value) -> HandlerResult<()> + Send + Sync + 'static,
    {
        self.member(name, MemberShape::Generator(Arc::new(body)))
    }

    /// A property with both a read and a write half. Never classified.
    pub fn accessor<G, S>(self, name: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn(&GetterContext) -> HandlerResult + Send + Sync + 'static,
        S: Fn(&mut StateSlice, Value) -> HandlerResult<()> + Send + Sync + 'static,
    {
        self.member(
            name,
            MemberShape::Accessor {
                get: Some(Arc::new(get)),
                set: Some(Arc::new(set)),
            },
        )
    }

    /// A plain synchronous method, reachable from contexts as a helper.
    pub fn method<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&HelperReceiver) -> HandlerResult + Send + Sync + 'static,
    {
        self.member(name, MemberShape::Method(Arc::new(body)))
    }

    /// An asynchronous method.
    pub fn action<F, Fut>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(ActionContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let boxed = move |ctx: ActionContext, payload: Value| body(ctx, payload).boxed();
        self.member(name, MemberShape::Async(Arc::new(boxed)))
    }

    /// A named link to another module, conventionally `$name`.
    pub fn module_ref(self, name: impl Into<String>, target: Arc<ModuleDescriptor>) -> Self {
        self.member(name, MemberShape::ModuleRef(target))
    }

    /// Inherit every member of `base`.
    pub fn extends(mut self, base: &ClassDef) -> Self {
        self.bases.push(base.clone());
        self
    }

    fn member(mut self, name: impl Into<String>, shape: MemberShape) -> Self {
        self.members.push((name.into(), shape));
        self
    }

    // ─── Flattening and building ────────────────────────────────────────

    /// Every member of the inheritance chain, ancestors first, overrides in
    /// place.
    pub fn flatten(&self) -> Vec<(String, MemberShape)> {
        let mut table = MemberTable::default();
        self.collect_into(&mut table);
        table
            .iter()
            .map(|entry| (entry.name.clone(), entry.value.clone()))
            .collect()
    }

    fn collect_into(&self, table: &mut MemberTable<MemberShape>) {
        for base in &self.bases {
            base.collect_into(table);
        }
        for (name, shape) in &self.members {
            table.upsert(name, name.clone(), shape.clone());
        }
    }

    /// Classify the flattened member set.
    pub fn classify(&self, config: &CmodConfig) -> Vec<MemberDescriptor> {
        self.flatten()
            .into_iter()
            .map(|(name, shape)| MemberDescriptor::new(name, shape, config))
            .collect()
    }

    /// Build a descriptor with default options.
    pub fn build(&self, namespace: &str) -> Arc<ModuleDescriptor> {
        self.build_with(namespace, ModuleOptions::default())
    }

    /// Build a descriptor.
    pub fn build_with(&self, namespace: &str, options: ModuleOptions) -> Arc<ModuleDescriptor> {
        let namespace = Namespace::resolve_with(namespace, &options.config.namespace);
        let members = self.classify(&options.config);
        Arc::new(ModuleDescriptor::assemble(
            self.name.clone(),
            namespace,
            members,
            options.children,
        ))
    }
}
