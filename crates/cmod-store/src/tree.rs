//! Per-module state slices and their nested rendering.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use cmod_core::{Namespace, RegistrationError, StateMap};

/// Live state, one slice per registered namespace.
///
/// Slices are stored flat; [`StateTree::to_value`] nests each slice under
/// its namespace segments, so a module at `cart/items` appears at
/// `root["cart"]["items"]`.
#[derive(Debug, Clone, Default)]
pub(crate) struct StateTree {
    slices: BTreeMap<Namespace, StateMap>,
}

impl StateTree {
    pub(crate) fn insert(&mut self, namespace: Namespace, slice: StateMap) {
        self.slices.insert(namespace, slice);
    }

    pub(crate) fn slice(&self, namespace: &Namespace) -> Option<&StateMap> {
        self.slices.get(namespace)
    }

    pub(crate) fn slice_mut(&mut self, namespace: &Namespace) -> Option<&mut StateMap> {
        self.slices.get_mut(namespace)
    }

    /// Overwrite declared fields with the values found in a nested
    /// snapshot. Fields the snapshot lacks keep their template value;
    /// fields a slice does not declare are ignored.
    pub(crate) fn hydrate(&mut self, snapshot: &Value) -> Result<(), RegistrationError> {
        for (namespace, slice) in self.slices.iter_mut() {
            let Some(node) = node_at(snapshot, namespace.segments()) else {
                continue;
            };
            let Value::Object(saved) = node else {
                return Err(RegistrationError::InvalidInitialState {
                    namespace: namespace.display_name(),
                });
            };
            for (field, value) in slice.iter_mut() {
                if let Some(saved_value) = saved.get(field) {
                    *value = saved_value.clone();
                }
            }
        }
        Ok(())
    }

    /// The whole tree as one nested JSON object.
    pub(crate) fn to_value(&self) -> Value {
        let mut root = Map::new();
        // Parents sort before their descendants.
        for (namespace, slice) in &self.slices {
            insert_at(&mut root, namespace.segments(), slice);
        }
        Value::Object(root)
    }
}

fn node_at<'a>(value: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(value, |node, segment| node.get(segment.as_str()))
}

fn insert_at(node: &mut Map<String, Value>, segments: &[String], slice: &StateMap) {
    match segments.split_first() {
        None => {
            for (field, value) in slice {
                node.insert(field.clone(), value.clone());
            }
        }
        Some((head, rest)) => {
            let child = node
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_at(map, rest, slice);
            }
        }
    }
}
