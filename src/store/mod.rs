//! Minimal document store
//!
//! Holds versioned records in memory and runs the compiled schema's hooks and
//! validators before every write. Version counters follow these rules:
//!
//! - appends bump the stored version without requiring a match
//! - array replaces and explicit increments require the stored version to
//!   match the copy, then bump it
//! - scalar sets leave the version alone

mod collection;
mod document;
mod errors;

pub use collection::Collection;
pub use document::{Document, Modification, Versioning};
pub use errors::{StoreError, StoreResult};
