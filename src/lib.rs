//! array_unique - Unique values within array fields of schema-validated documents
//!
//! A `unique` marking on an array field normally only describes a
//! cross-document unique index. [`unique::ArrayUniquePlugin`] adds the
//! per-document rule: a save is rejected when the array holds a value twice.

pub mod config;
pub mod index;
pub mod observability;
pub mod schema;
pub mod store;
pub mod unique;

pub use config::{CollectionConfig, Config, PluginConfig};
pub use schema::{CompiledSchema, FieldDef, FieldType, Schema};
pub use store::{Collection, Document, StoreError, StoreResult};
pub use unique::ArrayUniquePlugin;
