//! Schema subsystem
//!
//! Schemas are enforced at write time, before a document reaches the
//! collection.
//!
//! # Design Principles
//!
//! - Validation before persistence
//! - Explicit version binding
//! - Violations abort writes
//! - Plugins attach behavior once, at compile time
//! - Deterministic validation

mod compiled;
mod errors;
pub mod path;
mod types;
mod validator;

pub use compiled::{CompiledSchema, PathValidator, SaveHook, SchemaPlugin};
pub use errors::{
    SchemaError, SchemaErrorCode, SchemaResult, Severity, ValidationDetails, ValidationErrors,
};
pub use types::{FieldDef, FieldType, Schema, UniqueMarking};
pub use validator::check_structure;
