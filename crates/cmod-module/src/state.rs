//! The mutable local state slice handed to mutators.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use cmod_core::{HandlerResult, StateMap};

/// One module's state fields, owned for the duration of a single commit.
///
/// Mutators see nothing but this slice: no getters, actions or helpers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSlice {
    fields: StateMap,
}

impl StateSlice {
    /// Wrap a copy of a module's state.
    pub fn new(fields: StateMap) -> Self {
        Self { fields }
    }

    /// Current value of a field. Absent fields read as `null`.
    pub fn get(&self, field: &str) -> Value {
        self.fields.get(field).cloned().unwrap_or(Value::Null)
    }

    /// Decode a field into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, field: &str) -> HandlerResult<T> {
        Ok(serde_json::from_value(self.get(field))?)
    }

    /// Overwrite a field.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Serialize `value` into a field.
    pub fn set_as<T: Serialize>(&mut self, field: &str, value: &T) -> HandlerResult<()> {
        let encoded = serde_json::to_value(value)?;
        self.set(field, encoded);
        Ok(())
    }

    /// Every field of the slice.
    pub fn fields(&self) -> &StateMap {
        &self.fields
    }

    /// The slice as committed back into the store.
    pub fn into_inner(self) -> StateMap {
        self.fields
    }
}

/// Decode a handler payload, mapping failures to [`cmod_core::StoreError::Decode`].
pub fn decode<T: DeserializeOwned>(payload: Value) -> HandlerResult<T> {
    Ok(serde_json::from_value(payload)?)
}
