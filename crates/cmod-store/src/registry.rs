//! # Module Registry
//!
//! Walks a descriptor tree once at build time, validates its shape and
//! flattens every getter, mutator and action into root-level routing
//! tables keyed by fully qualified name.
//!
//! ## Registration rules
//!
//! - No two modules in the tree may share a namespace.
//! - A child's namespace must extend its parent's by at least one segment.
//!   With `strict_registration` off the violation is logged and the child
//!   is registered at its own namespace.
//! - The first segment of a child below its parent must not be a state
//!   field of the parent, since the child's slice nests under that key.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use cmod_core::{Namespace, RegistrationError, StoreConfig};
use cmod_module::{ModuleDescriptor, Role};

use crate::tree::StateTree;

/// Where a qualified key leads.
#[derive(Debug, Clone)]
pub(crate) struct Route {
    pub(crate) module: Arc<ModuleDescriptor>,
    pub(crate) name: String,
}

#[derive(Debug)]
pub(crate) struct Registry {
    modules: BTreeMap<Namespace, Arc<ModuleDescriptor>>,
    getters: HashMap<String, Route>,
    mutators: HashMap<String, Route>,
    actions: HashMap<String, Route>,
}

impl Registry {
    pub(crate) fn build(
        root: &Arc<ModuleDescriptor>,
        config: &StoreConfig,
    ) -> Result<Self, RegistrationError> {
        let mut registry = Self {
            modules: BTreeMap::new(),
            getters: HashMap::new(),
            mutators: HashMap::new(),
            actions: HashMap::new(),
        };
        registry.register(root, None, config)?;
        Ok(registry)
    }

    fn register(
        &mut self,
        module: &Arc<ModuleDescriptor>,
        parent: Option<&ModuleDescriptor>,
        config: &StoreConfig,
    ) -> Result<(), RegistrationError> {
        let namespace = module.namespace();
        if let Some(parent) = parent {
            check_child(parent, module, config)?;
        }
        if self.modules.contains_key(namespace) {
            return Err(RegistrationError::DuplicateNamespace {
                namespace: namespace.display_name(),
            });
        }
        self.modules.insert(namespace.clone(), Arc::clone(module));

        for (role, name, key) in module.routes() {
            let table = match role {
                Role::Getter => &mut self.getters,
                Role::Mutator => &mut self.mutators,
                Role::Action => &mut self.actions,
                Role::State => continue,
            };
            let route = Route {
                module: Arc::clone(module),
                name: name.to_string(),
            };
            if table.insert(key.to_string(), route).is_some() {
                tracing::warn!(%key, %role, "routing key registered twice, last module wins");
            }
        }

        tracing::info!(
            namespace = %namespace,
            class = module.name(),
            getters = module.getter_names().count(),
            mutators = module.mutator_names().count(),
            actions = module.action_names().count(),
            "registered module"
        );

        for child in module.children() {
            self.register(child, Some(module.as_ref()), config)?;
        }
        Ok(())
    }

    pub(crate) fn contains(&self, namespace: &Namespace) -> bool {
        self.modules.contains_key(namespace)
    }

    pub(crate) fn namespaces(&self) -> impl Iterator<Item = &Namespace> + '_ {
        self.modules.keys()
    }

    pub(crate) fn getter(&self, key: &str) -> Option<&Route> {
        self.getters.get(key)
    }

    pub(crate) fn mutator(&self, key: &str) -> Option<&Route> {
        self.mutators.get(key)
    }

    pub(crate) fn action(&self, key: &str) -> Option<&Route> {
        self.actions.get(key)
    }

    /// A state tree holding a fresh template copy for every module.
    pub(crate) fn initial_tree(&self) -> StateTree {
        let mut tree = StateTree::default();
        for (namespace, module) in &self.modules {
            tree.insert(namespace.clone(), module.state_factory());
        }
        tree
    }
}

fn check_child(
    parent: &ModuleDescriptor,
    child: &ModuleDescriptor,
    config: &StoreConfig,
) -> Result<(), RegistrationError> {
    let Some(relative) = child
        .namespace()
        .relative_to(parent.namespace())
        .filter(|rest| !rest.is_empty())
    else {
        if config.strict_registration {
            return Err(RegistrationError::DetachedChild {
                parent: parent.namespace().display_name(),
                child: child.namespace().display_name(),
            });
        }
        tracing::warn!(
            parent = %parent.namespace(),
            child = %child.namespace(),
            "child namespace does not extend its parent, registering as-is"
        );
        return Ok(());
    };

    let first = &relative[0];
    if parent.has_state_field(first) {
        return Err(RegistrationError::FieldShadowed {
            parent: parent.namespace().display_name(),
            child: child.namespace().display_name(),
            field: first.clone(),
        });
    }
    Ok(())
}
