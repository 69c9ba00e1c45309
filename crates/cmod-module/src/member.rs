//! # Member Classification
//!
//! Every member a class declares has a *shape* (how it was declared) and,
//! derived from the shape alone, at most one *role* (how the store exposes
//! it). Authors never name the role; the classifier infers it.
//!
//! ## Rules, in priority order
//!
//! | Shape                                   | Role      |
//! |-----------------------------------------|-----------|
//! | reserved name (`$x`, `_x`)              | none      |
//! | read accessor only                      | Getter    |
//! | write accessor only, or marked mutation | Mutator   |
//! | generator procedure                     | Mutator   |
//! | plain synchronous method                | none (helper) |
//! | asynchronous method                     | Action    |
//! | writable data field                     | State     |
//!
//! Accessors with both halves, read-only fields and module references never
//! receive a role. Classification cannot fail: anything unrecognized is
//! simply excluded. Excluded members are not routed, but methods, read
//! accessors, async methods and data fields stay reachable from contexts
//! as helpers.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use cmod_core::{BoxFuture, CmodConfig, HandlerResult};

use crate::context::{ActionContext, GetterContext, HelperReceiver};
use crate::descriptor::ModuleDescriptor;
use crate::state::StateSlice;

/// Body of a getter: derives a value from a read-only context.
pub type GetterFn = Arc<dyn Fn(&GetterContext) -> HandlerResult + Send + Sync>;

/// Body of a mutator: one synchronous transition of the local state slice.
pub type MutatorFn = Arc<dyn Fn(&mut StateSlice, Value) -> HandlerResult<()> + Send + Sync>;

/// Body of an action: an asynchronous operation over an action context.
pub type ActionFn =
    Arc<dyn Fn(ActionContext, Value) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Body of a helper: a plain callable reachable only from contexts.
pub type HelperFn = Arc<dyn Fn(&HelperReceiver) -> HandlerResult + Send + Sync>;

/// The capability a member is exposed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A writable data field in the module's state slice.
    State,
    /// A read-only derived value.
    Getter,
    /// A synchronous state transition.
    Mutator,
    /// An asynchronous operation.
    Action,
}

impl Role {
    /// Lowercase name used in reports and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "state field",
            Self::Getter => "getter",
            Self::Mutator => "mutator",
            Self::Action => "action",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a member was declared.
#[derive(Clone)]
pub enum MemberShape {
    /// A data field with its initial value.
    Field {
        /// Value copied into every fresh state slice.
        value: Value,
        /// Read-only fields are not part of state.
        writable: bool,
    },
    /// A property accessor with an optional read half and write half.
    Accessor {
        /// Read half.
        get: Option<GetterFn>,
        /// Write half.
        set: Option<MutatorFn>,
    },
    /// A generator-style procedure. Runs to completion on every commit.
    Generator(MutatorFn),
    /// A plain synchronous callable.
    Method(HelperFn),
    /// An asynchronous callable.
    Async(ActionFn),
    /// A named link to another module.
    ModuleRef(Arc<ModuleDescriptor>),
}

impl MemberShape {
    /// Short name of the declaration form.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Field { writable: true, .. } => "field",
            Self::Field { writable: false, .. } => "constant",
            Self::Accessor {
                get: Some(_),
                set: Some(_),
            } => "accessor",
            Self::Accessor { get: Some(_), .. } => "get accessor",
            Self::Accessor { set: Some(_), .. } => "set accessor",
            Self::Accessor { .. } => "empty accessor",
            Self::Generator(_) => "generator",
            Self::Method(_) => "method",
            Self::Async(_) => "async method",
            Self::ModuleRef(_) => "module reference",
        }
    }
}

impl fmt::Debug for MemberShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field { value, writable } => f
                .debug_struct("Field")
                .field("value", value)
                .field("writable", writable)
                .finish(),
            Self::ModuleRef(target) => f
                .debug_tuple("ModuleRef")
                .field(&target.namespace().display_name())
                .finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// A member found anywhere in a class's inheritance chain, with its role.
#[derive(Debug, Clone)]
pub struct MemberDescriptor {
    /// Member name.
    pub name: String,
    /// Inferred role, `None` when excluded.
    pub role: Option<Role>,
    /// Declaration form.
    pub shape: MemberShape,
}

impl MemberDescriptor {
    /// Classify a declared member.
    pub fn new(name: impl Into<String>, shape: MemberShape, config: &CmodConfig) -> Self {
        let name = name.into();
        let role = classify(&name, &shape, config);
        Self { name, role, shape }
    }

    /// True if the member is an async operation.
    pub fn is_async(&self) -> bool {
        matches!(self.shape, MemberShape::Async(_))
    }
}

/// Infer the role of a member from its name and shape.
pub fn classify(name: &str, shape: &MemberShape, config: &CmodConfig) -> Option<Role> {
    if config.is_reserved(name) {
        return None;
    }
    match shape {
        MemberShape::Accessor {
            get: Some(_),
            set: None,
        } => Some(Role::Getter),
        MemberShape::Accessor {
            get: None,
            set: Some(_),
        } => Some(Role::Mutator),
        // Both halves, or neither.
        MemberShape::Accessor { .. } => None,
        MemberShape::Generator(_) => Some(Role::Mutator),
        MemberShape::Method(_) => None,
        MemberShape::Async(_) => Some(Role::Action),
        MemberShape::Field { writable: true, .. } => Some(Role::State),
        MemberShape::Field { writable: false, .. } => None,
        MemberShape::ModuleRef(_) => None,
    }
}
