//! Relstore - In-Memory Relational Object Graph
//!
//! Turns nested raw data (JSON) into a graph of typed records:
//! - Records are registered under identity keys and looked up by key
//! - Typed, directed relation edges between records, with back-relations
//! - Relations declared by key before the keyed record exists are resolved
//!   in place once it is added
//! - Field-driven loading, access, mutation and dumping of records
//!
//! # Example
//!
//! ```
//! use relstore::schema::{FieldDef, KeyFieldRef, TypeRegistry};
//! use relstore::Store;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut registry = TypeRegistry::new();
//! registry
//!     .register("SomeEntity", vec![FieldDef::key("id")])
//!     .unwrap();
//! registry
//!     .register(
//!         "Holder",
//!         vec![FieldDef::key_nested(
//!             "entity",
//!             KeyFieldRef::new("SomeEntity", "id"),
//!             "entity_id",
//!         )],
//!     )
//!     .unwrap();
//!
//! let mut store = Store::new(Arc::new(registry.build().unwrap()));
//! let holder = store.load("Holder", json!({"entity_id": 456})).unwrap();
//! assert_eq!(store.one(holder, "entity").unwrap(), None);
//!
//! let entity = store.load("SomeEntity", json!({"id": 456})).unwrap();
//! assert_eq!(store.one(holder, "entity").unwrap(), Some(entity));
//! ```

pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod schema;
pub mod store;

pub use config::{KeyRegistration, StoreConfig};
pub use error::{SchemaError, StoreError};
pub use ids::{FieldId, KeyValue, Node, PendingRef, RecordId, RelationKind, TypeTag};
pub use model::{DumpOptions, FieldValue, RelationList};
pub use store::{memory, Record, Store};
