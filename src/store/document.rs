//! In-memory document copies
//!
//! A [`Document`] is one caller's copy of a stored record. Changes are applied
//! to the copy immediately and also recorded as [`Modification`]s; a save
//! replays the modifications against the *stored* record, not the copy.
//! Two copies loaded at the same version can therefore both append to the
//! same stored array.

use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};
use crate::schema::path::{assign, lookup, lookup_mut};

/// A recorded change to a document copy.
#[derive(Debug, Clone, PartialEq)]
pub enum Modification {
    /// Append to the stored array at `path`
    Push { path: String, values: Vec<Value> },
    /// Replace the stored value at `path`
    Set { path: String, value: Value },
}

impl Modification {
    pub fn path(&self) -> &str {
        match self {
            Modification::Push { path, .. } | Modification::Set { path, .. } => path,
        }
    }
}

/// What a save must do with the stored version counter.
///
/// Ordered: a copy only ever moves up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Versioning {
    /// Leave the version alone
    None,
    /// Bump the version, no match required
    Increment,
    /// Require the stored version to match the copy, then bump
    MatchAndIncrement,
}

/// An in-memory copy of one record.
#[derive(Debug, Clone)]
pub struct Document {
    id: String,
    body: Map<String, Value>,
    version: u64,
    is_new: bool,
    modifications: Vec<Modification>,
    versioning: Versioning,
}

impl Document {
    /// Creates an unsaved document. `body` must hold a string `_id`.
    pub(crate) fn new_unsaved(body: Map<String, Value>) -> StoreResult<Self> {
        let id = match body.get("_id") {
            Some(Value::String(id)) => id.clone(),
            _ => return Err(StoreError::InvalidDocument("'_id' must be a string".into())),
        };
        Ok(Self {
            id,
            body,
            version: 0,
            is_new: true,
            modifications: Vec::new(),
            versioning: Versioning::None,
        })
    }

    /// Creates a clean copy of a stored record.
    pub(crate) fn from_stored(id: String, body: Map<String, Value>, version: u64) -> Self {
        Self {
            id,
            body,
            version,
            is_new: false,
            modifications: Vec::new(),
            versioning: Versioning::None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Version the copy was loaded at (or last saved as).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// True until the first successful save.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Reads the value at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.body, path)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.body.clone())
    }

    pub fn modifications(&self) -> &[Modification] {
        &self.modifications
    }

    pub fn versioning(&self) -> Versioning {
        self.versioning
    }

    /// Appends `value` to the array at `path`.
    pub fn push(&mut self, path: &str, value: Value) -> StoreResult<()> {
        match lookup_mut(&mut self.body, path) {
            Some(Value::Array(items)) => items.push(value.clone()),
            _ => return Err(StoreError::NotAnArray(path.to_string())),
        }

        // An earlier replace of the same array absorbs the append
        if let Some(Modification::Set { value: set, .. }) = self
            .modifications
            .iter_mut()
            .find(|m| m.path() == path)
        {
            if let Some(current) = lookup(&self.body, path) {
                *set = current.clone();
            }
            return Ok(());
        }

        match self.modifications.iter_mut().find(|m| m.path() == path) {
            Some(Modification::Push { values, .. }) => values.push(value),
            _ => self.modifications.push(Modification::Push {
                path: path.to_string(),
                values: vec![value],
            }),
        }
        self.raise(Versioning::Increment);
        Ok(())
    }

    /// Replaces the value at `path`.
    ///
    /// Replacing an array requires a version match on save.
    pub fn set(&mut self, path: &str, value: Value) -> StoreResult<()> {
        if path == "_id" || path.starts_with("_id.") {
            return Err(StoreError::InvalidDocument("'_id' is immutable".into()));
        }

        let replaces_array = value.is_array() || self.get(path).map_or(false, Value::is_array);
        if !assign(&mut self.body, path, value.clone()) {
            return Err(StoreError::InvalidDocument(format!(
                "cannot set '{}' below a non-object value",
                path
            )));
        }

        let nested = format!("{}.", path);
        self.modifications
            .retain(|m| m.path() != path && !m.path().starts_with(&nested));
        self.modifications.push(Modification::Set {
            path: path.to_string(),
            value,
        });

        if replaces_array {
            self.raise(Versioning::MatchAndIncrement);
        }
        Ok(())
    }

    /// Requires the stored version to match this copy on the next save.
    pub fn increment(&mut self) {
        self.raise(Versioning::MatchAndIncrement);
    }

    /// True if `path`, a parent of it, or a child of it was changed.
    pub fn is_modified(&self, path: &str) -> bool {
        self.modifications.iter().any(|m| {
            let modified = m.path();
            modified == path
                || is_parent(path, modified)
                || is_parent(modified, path)
        })
    }

    /// Changed paths in first-change order.
    pub fn modified_paths(&self) -> Vec<&str> {
        self.modifications.iter().map(Modification::path).collect()
    }

    /// True if a save has anything to write.
    pub fn has_changes(&self) -> bool {
        !self.modifications.is_empty() || self.versioning != Versioning::None
    }

    fn raise(&mut self, versioning: Versioning) {
        self.versioning = self.versioning.max(versioning);
    }

    /// Called by the collection after a successful write.
    pub(crate) fn mark_saved(&mut self) {
        if !self.is_new && self.versioning != Versioning::None {
            self.version += 1;
        }
        self.is_new = false;
        self.modifications.clear();
        self.versioning = Versioning::None;
    }
}

fn is_parent(parent: &str, child: &str) -> bool {
    child.len() > parent.len()
        && child.starts_with(parent)
        && child.as_bytes()[parent.len()] == b'.'
}
