//! # Bundled Demo Modules
//!
//! Small module trees used by `cmod inspect` and `cmod run`:
//!
//! - `simple`: a person module with a name mutator, derived name getters and
//!   an action that awaits the `salutation` child module.
//! - `salutation`: a standalone module resolving a salutation by gender.
//! - `nested`: a root getter that reads a child module's state.

use std::sync::Arc;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use cmod_core::CmodConfig;
use cmod_module::{use_module, ClassDef, ModuleDescriptor, ModuleOptions};
use cmod_store::Store;

/// A bundled demo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    Simple,
    Salutation,
    Nested,
}

/// One observed step of a demo scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub label: String,
    pub value: Value,
}

impl Step {
    fn new(label: impl Into<String>, value: Value) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Gender {
    Male,
    Female,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct SaluteRequest {
    gender: Gender,
}

#[derive(Debug, Serialize, Deserialize)]
struct Name {
    prename: String,
    lastname: String,
}

impl Demo {
    /// The demo's root descriptor.
    pub fn module(&self, config: &CmodConfig) -> Arc<ModuleDescriptor> {
        match self {
            Self::Simple => simple_module(config),
            Self::Salutation => salutation_module(config),
            Self::Nested => nested_module(config),
        }
    }

    /// Register the demo in a fresh store and play its scenario.
    pub async fn run(&self, config: &CmodConfig) -> Result<(Store, Vec<Step>)> {
        let root = self.module(config);
        let store = Store::builder(Arc::clone(&root))
            .config(config.clone())
            .build()?;
        let steps = match self {
            Self::Simple => run_simple(&root, &store).await?,
            Self::Salutation => run_salutation(&root, &store).await?,
            Self::Nested => run_nested(&root, &store)?,
        };
        Ok((store, steps))
    }
}

fn options(config: &CmodConfig) -> ModuleOptions {
    ModuleOptions::new().config(config.clone())
}

// ─── salutation ─────────────────────────────────────────────────────────

/// Standalone module resolving a salutation from a gender.
pub fn salutation_module(config: &CmodConfig) -> Arc<ModuleDescriptor> {
    ClassDef::new("SalutationModule")
        .field("maleSalutation", "Mr.")
        .field("femaleSalutation", "Mrs.")
        .action("salute", |ctx, payload| async move {
            let request: SaluteRequest = cmod_module::decode(payload)?;
            match request.gender {
                Gender::Male => ctx.state("maleSalutation"),
                Gender::Female => ctx.state("femaleSalutation"),
                Gender::Other => Ok(json!("dear")),
            }
        })
        .build_with("salutation", options(config))
}

async fn run_salutation(root: &Arc<ModuleDescriptor>, store: &Store) -> Result<Vec<Step>> {
    let facade = use_module(root, store)?;
    let mut steps = Vec::new();
    for gender in ["male", "female", "other"] {
        let value = facade.dispatch("salute", json!({ "gender": gender })).await?;
        steps.push(Step::new(format!("salute {gender}"), value));
    }
    Ok(steps)
}

// ─── simple ─────────────────────────────────────────────────────────────

/// Person module with a `$salutation` child reference.
pub fn simple_module(config: &CmodConfig) -> Arc<ModuleDescriptor> {
    let salutation = salutation_module(config);
    ClassDef::new("RootModule")
        .field("lineEnding", "\n")
        .field("prename", "Jane")
        .field("lastname", "Doe")
        .module_ref("$salutation", Arc::clone(&salutation))
        .getter("text", |ctx| {
            Ok(json!(format!("Hello {}", ctx.getter_as::<String>("fullname")?)))
        })
        .getter("fullname", |ctx| {
            let prename = ctx.state_as::<String>("prename")?;
            let lastname = ctx.state_as::<String>("lastname")?;
            Ok(json!(format!("{prename} {lastname}")))
        })
        .mutation("setName", |state, payload| {
            let name: Name = cmod_module::decode(payload)?;
            state.set("prename", name.prename);
            state.set("lastname", name.lastname);
            Ok(())
        })
        .action("action", |ctx, payload| async move {
            let hello = payload["hello"].as_str().unwrap_or("Hello").to_string();
            let salute = ctx
                .module("$salutation")?
                .dispatch("salute", json!({ "gender": "male" }))
                .await?;
            let salute = salute.as_str().unwrap_or_default().to_string();
            let fullname = ctx.getter_as::<String>("fullname")?;
            let line_ending = ctx.state_as::<String>("lineEnding")?;
            Ok(json!(format!("{hello} {salute} {fullname}!{line_ending}")))
        })
        .build_with("", options(config).child(salutation))
}

async fn run_simple(root: &Arc<ModuleDescriptor>, store: &Store) -> Result<Vec<Step>> {
    let facade = use_module(root, store)?;
    let mut steps = vec![Step::new("get text", facade.get("text")?)];

    let name = Name {
        prename: "John".into(),
        lastname: "Smith".into(),
    };
    facade.set("setName", serde_json::to_value(&name)?)?;
    steps.push(Step::new("commit setName", serde_json::to_value(&name)?));
    steps.push(Step::new("get text", facade.get("text")?));

    let greeting = facade.dispatch("action", json!({ "hello": "Heyho" })).await?;
    steps.push(Step::new("dispatch action", greeting));
    Ok(steps)
}

// ─── nested ─────────────────────────────────────────────────────────────

/// Root module whose getter reads a child module's state.
pub fn nested_module(config: &CmodConfig) -> Arc<ModuleDescriptor> {
    let salutations = ClassDef::new("Salutations")
        .field("salutation", "Mrs.")
        .build_with("salutations", options(config));
    ClassDef::new("RootModule")
        .module_ref("$nested", Arc::clone(&salutations))
        .field("prename", "Jane")
        .field("lastname", "Doe")
        .getter("salutation", |ctx| {
            let salutation = ctx.module("$nested")?.state_as::<String>("salutation")?;
            let prename = ctx.state_as::<String>("prename")?;
            let lastname = ctx.state_as::<String>("lastname")?;
            Ok(json!(format!("Hello {salutation} {prename} {lastname}")))
        })
        .build_with("", options(config).child(salutations))
}

fn run_nested(root: &Arc<ModuleDescriptor>, store: &Store) -> Result<Vec<Step>> {
    let facade = use_module(root, store)?;
    Ok(vec![Step::new("get salutation", facade.get("salutation")?)])
}
