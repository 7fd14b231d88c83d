//! Unique values within array fields
//!
//! Marking an array field `unique` in a schema normally only describes a
//! cross-document index: it keeps two documents from sharing a value but
//! lets one document hold the same value twice. [`ArrayUniquePlugin`] adds
//! the per-document rule.
//!
//! # Usage
//!
//! ```ignore
//! let compiled = CompiledSchema::new(schema).with_plugin(&ArrayUniquePlugin::default())?;
//! let collection = Collection::new("tests", Arc::new(compiled), CollectionConfig::default())?;
//! ```

mod plugin;
mod validator;

pub use plugin::{ArrayUniquePlugin, ForceVersionHook};
pub use validator::UniqueArrayValidator;
