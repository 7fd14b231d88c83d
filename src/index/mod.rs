//! Value keys and cross-document unique indexes
//!
//! Indexes are derived, in-memory-only state maintained by the collection.
//!
//! # Design Principles
//!
//! - Deterministic: BTreeMap iteration order
//! - One canonical key per value, shared with the array validator
//! - Updates occur together with the record write

mod key;
mod unique;

pub use key::IndexKey;
pub use unique::{IndexConflict, UniqueIndex};
