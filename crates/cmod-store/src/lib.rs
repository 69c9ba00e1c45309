//! # cmod-store — Reference Backing Store
//!
//! The in-memory engine that hosts cmod module descriptors. It validates a
//! descriptor tree at registration, owns one state slice per module,
//! serializes commits, instruments dispatches and notifies commit
//! subscribers.
//!
//! ```
//! use cmod_module::{use_module, ClassDef};
//! use cmod_store::Store;
//! use serde_json::json;
//!
//! let counter = ClassDef::new("Counter")
//!     .field("test", 123)
//!     .getter("double", |ctx| Ok(json!(ctx.state_as::<i64>("test")? * 2)))
//!     .setter("setTest", |state, value| {
//!         state.set("test", value);
//!         Ok(())
//!     })
//!     .build("");
//!
//! let store = Store::new(counter.clone()).unwrap();
//! let facade = use_module(&counter, &store).unwrap();
//! assert_eq!(facade.get("double").unwrap(), json!(246));
//!
//! facade.set("setTest", 10).unwrap();
//! assert_eq!(facade.state("test").unwrap(), json!(10));
//! assert_eq!(facade.get("double").unwrap(), json!(20));
//! ```

mod registry;
pub mod store;
mod tree;

pub use store::{CommitRecord, Store, StoreBuilder};
