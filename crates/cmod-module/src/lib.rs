//! # cmod-module — Classified Module Definitions
//!
//! Turns an explicit class declaration into a namespaced module descriptor
//! and binds descriptors to a backing store at invocation time.
//!
//! ## Pipeline
//!
//! ```text
//! ClassDef ──flatten──▶ members ──classify──▶ ModuleDescriptor ──register──▶ store
//!                                                    │
//!                     use_module / contexts ◀────────┘  (read live from store)
//! ```
//!
//! - [`ClassDef`]: fields, accessors, procedures, module references and bases.
//! - [`member::classify`]: infers State / Getter / Mutator / Action per member.
//! - [`ModuleDescriptor`]: immutable role tables with precomputed keys.
//! - [`GetterContext`], [`ActionContext`], [`HelperReceiver`]: per-call
//!   receivers for user bodies.
//! - [`use_module`] / [`ModuleFacade`]: the external live handle.
//!
//! The crate does not own state. Any [`cmod_core::StoreLike`] implementation
//! can host descriptors; `cmod-store` provides the reference one.

pub mod class;
pub mod context;
pub mod descriptor;
pub mod facade;
pub mod member;
pub mod state;
mod table;

#[cfg(test)]
mod testing;

pub use class::{ClassDef, ModuleOptions};
pub use context::{ActionContext, GetterContext, HelperReceiver};
pub use descriptor::{ModuleDescriptor, ModuleSummary};
pub use facade::{use_module, Access, Committer, Dispatcher, ModuleFacade};
pub use member::{classify, MemberDescriptor, MemberShape, Role};
pub use state::{decode, StateSlice};
