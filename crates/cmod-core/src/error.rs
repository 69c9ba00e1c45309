//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types used throughout cmod. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - The engine introduces only wiring, routing and registration errors.
//! - Errors raised inside user getters, mutators and actions are carried by
//!   [`StoreError::Handler`] and are never rewritten on their way to the
//!   awaiting caller.

use thiserror::Error;

/// Result type of every user-supplied handler body.
pub type HandlerResult<T = serde_json::Value> = Result<T, StoreError>;

/// Top-level error type crossing the backing-store boundary.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A facade or context was requested for a module the store does not hold.
    #[error("module not wired: no module registered at namespace '{namespace}'")]
    NotWired {
        /// Display form of the unresolved namespace.
        namespace: String,
    },

    /// A member name was used that the module does not declare in that role.
    #[error("module '{namespace}' has no {kind} named '{name}'")]
    UnknownMember {
        /// Display form of the module's namespace.
        namespace: String,
        /// The role that was looked up ("getter", "mutator", ...).
        kind: &'static str,
        /// The requested member name.
        name: String,
    },

    /// A fully qualified key did not match any routing table entry.
    #[error("no {kind} registered under key '{key}'")]
    UnknownKey {
        /// The routing table that was consulted.
        kind: &'static str,
        /// The qualified key that missed.
        key: String,
    },

    /// A write or call was attempted through a read-only surface.
    #[error("{operation} is not permitted from a read-only context")]
    ReadOnly {
        /// The rejected operation, e.g. `commit 'nested/setName'`.
        operation: String,
    },

    /// An asynchronous helper was called from a synchronous receiver.
    #[error("helper '{name}' of module '{namespace}' is asynchronous and can only be awaited from an action")]
    AsyncHelper {
        /// Display form of the module's namespace.
        namespace: String,
        /// The helper name.
        name: String,
    },

    /// An injected service was requested but never provided.
    #[error("service `{0}` is not provided by this store")]
    MissingService(&'static str),

    /// The descriptor tree could not be registered.
    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// A payload or state value could not be decoded into the requested type.
    #[error("value decoding failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// A failure raised by a user getter, mutator, action or helper.
    #[error(transparent)]
    Handler(anyhow::Error),
}

impl StoreError {
    /// Build a handler failure from a message.
    pub fn handler(message: impl std::fmt::Display) -> Self {
        Self::Handler(anyhow::anyhow!("{message}"))
    }

    /// Wrap any error raised by user code.
    pub fn from_handler<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Handler(anyhow::Error::new(err))
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::Handler(err)
    }
}

/// Error while registering a descriptor tree into a backing store.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Two modules in one tree resolve to the same namespace.
    #[error("namespace '{namespace}' is registered more than once")]
    DuplicateNamespace {
        /// The colliding namespace.
        namespace: String,
    },

    /// A child's namespace is not strictly below its parent's.
    #[error("child namespace '{child}' does not extend parent namespace '{parent}'")]
    DetachedChild {
        /// The parent module namespace.
        parent: String,
        /// The offending child namespace.
        child: String,
    },

    /// A child module would be nested under a key the parent uses for state.
    #[error("child module '{child}' shadows state field '{field}' of module '{parent}'")]
    FieldShadowed {
        /// The parent module namespace.
        parent: String,
        /// The child module namespace.
        child: String,
        /// The parent state field that collides.
        field: String,
    },

    /// Hydration data for a module was present but not an object.
    #[error("initial state for module '{namespace}' must be an object")]
    InvalidInitialState {
        /// The module whose hydration data is malformed.
        namespace: String,
    },
}

/// Error while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration document is not valid YAML for `CmodConfig`.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}
