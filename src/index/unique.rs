//! Cross-document unique indexes
//!
//! One index per `unique` marking. Entries are the distinct values of each
//! document, so a document never conflicts with itself: a single document
//! may hold the same value twice in an array without tripping the index.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::key::IndexKey;
use crate::schema::UniqueMarking;

/// A conflicting index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConflict {
    /// Index name (`<path>_1`)
    pub index: String,
    /// The duplicated value
    pub key: IndexKey,
    /// Document that already holds the value
    pub holder: String,
}

/// Unique index over one marking.
#[derive(Debug)]
pub struct UniqueIndex {
    name: String,
    marking: UniqueMarking,
    /// Maps key values to the owning document id
    entries: BTreeMap<IndexKey, String>,
}

impl UniqueIndex {
    pub fn new(marking: UniqueMarking) -> Self {
        Self {
            name: format!("{}_1", marking.path),
            marking,
            entries: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of distinct indexed values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the distinct keys a document contributes.
    pub fn keys_for(&self, document: &Value) -> BTreeSet<IndexKey> {
        self.marking
            .values(document)
            .into_iter()
            .map(IndexKey::from_json)
            .collect()
    }

    /// Finds the first key of `document` held by another document.
    pub fn check(&self, id: &str, document: &Value) -> Option<IndexConflict> {
        self.keys_for(document).into_iter().find_map(|key| {
            match self.entries.get(&key) {
                Some(holder) if holder != id => Some(IndexConflict {
                    index: self.name.clone(),
                    key,
                    holder: holder.clone(),
                }),
                _ => None,
            }
        })
    }

    /// Replaces the entries of `id`: removes keys from `old`, adds keys from `new`.
    ///
    /// Callers run [`check`](Self::check) first.
    pub fn update(&mut self, id: &str, old: Option<&Value>, new: &Value) {
        if let Some(old) = old {
            for key in self.keys_for(old) {
                if self.entries.get(&key).map(String::as_str) == Some(id) {
                    self.entries.remove(&key);
                }
            }
        }
        for key in self.keys_for(new) {
            self.entries.insert(key, id.to_string());
        }
    }
}
