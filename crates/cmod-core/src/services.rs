//! # Injected Services
//!
//! Embedders attach ambient collaborators (API clients, clocks, loggers) to
//! a backing store. Action helpers reach them through their receiver by
//! type. Getter helpers never see services: their receiver is limited to
//! state and getters.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::StoreError;

/// A type-keyed registry of shared services.
#[derive(Clone, Default)]
pub struct Services {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Services {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide a service, replacing any previous value of the same type.
    pub fn insert<T: Any + Send + Sync>(&mut self, service: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(service));
    }

    /// Look up a service by type.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| Arc::clone(entry).downcast::<T>().ok())
    }

    /// Look up a service by type, failing with [`StoreError::MissingService`].
    pub fn require<T: Any + Send + Sync>(&self) -> Result<Arc<T>, StoreError> {
        self.get::<T>()
            .ok_or(StoreError::MissingService(std::any::type_name::<T>()))
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no service is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("count", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Clock(u64);

    #[test]
    fn test_insert_and_get() {
        let mut services = Services::new();
        services.insert(Clock(42));
        assert_eq!(*services.get::<Clock>().unwrap(), Clock(42));
        assert_eq!(services.len(), 1);
    }

    #[test]
    fn test_replace_same_type() {
        let mut services = Services::new();
        services.insert(Clock(1));
        services.insert(Clock(2));
        assert_eq!(services.len(), 1);
        assert_eq!(services.get::<Clock>().unwrap().0, 2);
    }

    #[test]
    fn test_require_missing() {
        let services = Services::new();
        let err = services.require::<Clock>().unwrap_err();
        assert!(matches!(err, StoreError::MissingService(name) if name.ends_with("Clock")));
    }
}
