//! Versioned in-memory collection
//!
//! Save pipeline:
//! 1. pre-save hooks
//! 2. validation of the in-memory copy (nothing is written on failure)
//! 3. under the write lock: version check when required, replay of the copy's
//!    modifications against the stored record, unique index check, commit
//!
//! The stored result of step 3 is not re-validated. Appends from two stale
//! copies both land unless a version match was required.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use super::document::{Document, Modification, Versioning};
use super::errors::{StoreError, StoreResult};
use crate::config::CollectionConfig;
use crate::index::UniqueIndex;
use crate::observability::Event;
use crate::schema::path::{assign, lookup_mut};
use crate::schema::CompiledSchema;

#[derive(Debug, Clone)]
struct StoredRecord {
    body: Value,
    version: u64,
}

#[derive(Debug, Default)]
struct CollectionState {
    records: BTreeMap<String, StoredRecord>,
    indexes: Vec<UniqueIndex>,
}

/// Records of one compiled schema.
#[derive(Debug)]
pub struct Collection {
    name: String,
    schema: Arc<CompiledSchema>,
    config: CollectionConfig,
    state: RwLock<CollectionState>,
}

impl Collection {
    /// Creates an empty collection.
    ///
    /// With `auto_index` on, one unique index is built per `unique` marking.
    pub fn new(
        name: impl Into<String>,
        schema: Arc<CompiledSchema>,
        config: CollectionConfig,
    ) -> StoreResult<Self> {
        let indexes = if config.auto_index {
            schema
                .schema()
                .unique_markings()?
                .into_iter()
                .map(UniqueIndex::new)
                .collect()
        } else {
            Vec::new()
        };

        Ok(Self {
            name: name.into(),
            schema,
            config,
            state: RwLock::new(CollectionState {
                records: BTreeMap::new(),
                indexes,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// Number of stored records.
    pub fn count(&self) -> StoreResult<usize> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state.records.len())
    }

    /// Builds an unsaved document: assigns an `_id` when absent and fills
    /// declared arrays with `[]`.
    pub fn new_document(&self, body: Value) -> StoreResult<Document> {
        let mut body = match body {
            Value::Object(map) => map,
            _ => {
                return Err(StoreError::InvalidDocument(
                    "document body must be an object".into(),
                ))
            }
        };
        if !body.contains_key("_id") {
            body.insert("_id".into(), Value::String(Uuid::new_v4().simple().to_string()));
        }
        self.schema.schema().apply_defaults(&mut body);
        Document::new_unsaved(body)
    }

    /// Builds and saves a new document.
    pub fn create(&self, body: Value) -> StoreResult<Document> {
        let mut doc = self.new_document(body)?;
        self.save(&mut doc)?;
        Ok(doc)
    }

    /// Loads a fresh copy of a stored record.
    pub fn find_by_id(&self, id: &str) -> StoreResult<Option<Document>> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state.records.get(id).map(|record| {
            let body = match &record.body {
                Value::Object(map) => map.clone(),
                _ => Map::new(),
            };
            Document::from_stored(id.to_string(), body, record.version)
        }))
    }

    /// Persists a document copy.
    ///
    /// On failure nothing is written and the copy keeps its modifications.
    pub fn save(&self, doc: &mut Document) -> StoreResult<()> {
        self.schema.run_pre_save(doc);

        let candidate = doc.to_value();
        if let Err(errors) = self.schema.validate(&candidate) {
            warn!(
                event = Event::ValidationFailed.as_str(),
                collection = %self.name,
                id = %doc.id(),
                "{}",
                errors
            );
            return Err(StoreError::Validation(errors));
        }

        if !doc.is_new() && !doc.has_changes() {
            return Ok(());
        }

        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        if doc.is_new() {
            self.insert(&mut state, doc, candidate)?;
            info!(
                event = Event::DocumentCreated.as_str(),
                collection = %self.name,
                id = %doc.id(),
                "document created"
            );
        } else {
            let version = self.update(&mut state, doc)?;
            info!(
                event = Event::DocumentSaved.as_str(),
                collection = %self.name,
                id = %doc.id(),
                version,
                "document saved"
            );
        }

        doc.mark_saved();
        Ok(())
    }

    fn insert(&self, state: &mut CollectionState, doc: &Document, body: Value) -> StoreResult<()> {
        if state.records.contains_key(doc.id()) {
            return Err(self.duplicate_key("_id_", "_id", format!("{:?}", doc.id())));
        }
        self.check_indexes(state, doc.id(), &body)?;

        for index in &mut state.indexes {
            index.update(doc.id(), None, &body);
        }
        state
            .records
            .insert(doc.id().to_string(), StoredRecord { body, version: 0 });
        Ok(())
    }

    /// Returns the new stored version.
    fn update(&self, state: &mut CollectionState, doc: &Document) -> StoreResult<u64> {
        let record = state
            .records
            .get(doc.id())
            .ok_or_else(|| StoreError::DocumentNotFound(doc.id().to_string()))?;

        if doc.versioning() == Versioning::MatchAndIncrement && record.version != doc.version() {
            warn!(
                event = Event::VersionConflict.as_str(),
                collection = %self.name,
                id = %doc.id(),
                expected = doc.version(),
                stored = record.version,
                "stale document"
            );
            return Err(StoreError::VersionConflict {
                id: doc.id().to_string(),
                version: doc.version(),
                modified_paths: doc.modified_paths().into_iter().map(String::from).collect(),
            });
        }

        let mut body = match &record.body {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        for modification in doc.modifications() {
            apply(&mut body, modification)?;
        }
        let body = Value::Object(body);

        self.check_indexes(state, doc.id(), &body)?;

        let version = if doc.versioning() == Versioning::None {
            record.version
        } else {
            record.version + 1
        };
        let old = record.body.clone();

        for index in &mut state.indexes {
            index.update(doc.id(), Some(&old), &body);
        }
        state
            .records
            .insert(doc.id().to_string(), StoredRecord { body, version });
        Ok(version)
    }

    fn check_indexes(&self, state: &CollectionState, id: &str, body: &Value) -> StoreResult<()> {
        for index in &state.indexes {
            if let Some(conflict) = index.check(id, body) {
                warn!(
                    event = Event::DuplicateKey.as_str(),
                    collection = %self.name,
                    index = %conflict.index,
                    id = %id,
                    holder = %conflict.holder,
                    "unique index violation"
                );
                let path = conflict
                    .index
                    .strip_suffix("_1")
                    .unwrap_or(&conflict.index)
                    .to_string();
                return Err(self.duplicate_key(&conflict.index, &path, conflict.key.to_string()));
            }
        }
        Ok(())
    }

    fn duplicate_key(&self, index: &str, path: &str, key: String) -> StoreError {
        StoreError::DuplicateKey {
            collection: self.name.clone(),
            index: index.to_string(),
            path: path.to_string(),
            key,
        }
    }
}

/// Replays one modification against a stored body.
fn apply(body: &mut Map<String, Value>, modification: &Modification) -> StoreResult<()> {
    match modification {
        Modification::Push { path, values } => match lookup_mut(body, path) {
            Some(Value::Array(items)) => items.extend(values.iter().cloned()),
            Some(_) => return Err(StoreError::NotAnArray(path.clone())),
            None => {
                if !assign(body, path, Value::Array(values.clone())) {
                    return Err(StoreError::NotAnArray(path.clone()));
                }
            }
        },
        Modification::Set { path, value } => {
            if !assign(body, path, value.clone()) {
                return Err(StoreError::InvalidDocument(format!(
                    "cannot set '{}' below a non-object value",
                    path
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldType, Schema};
    use serde_json::json;
    use std::collections::HashMap;

    fn collection(auto_index: bool) -> Collection {
        let mut fields = HashMap::new();
        fields.insert("_id".to_string(), FieldDef::required_string());
        fields.insert("arr".to_string(), FieldDef::optional_array(FieldType::String).unique());
        fields.insert("name".to_string(), FieldDef::optional_string());

        Collection::new(
            "tests",
            Arc::new(CompiledSchema::new(Schema::new("tests", "v1", fields))),
            CollectionConfig { auto_index },
        )
        .unwrap()
    }

    #[test]
    fn test_create_assigns_id_and_defaults() {
        let c = collection(false);
        let doc = c.create(json!({})).unwrap();

        assert!(!doc.is_new());
        assert_eq!(doc.version(), 0);
        assert_eq!(doc.get("arr"), Some(&json!([])));
        assert_eq!(doc.id().len(), 32);
        assert_eq!(c.count().unwrap(), 1);
    }

    #[test]
    fn test_create_rejects_non_object() {
        let c = collection(false);
        assert!(matches!(
            c.create(json!([1, 2])),
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_create_with_explicit_id_twice() {
        let c = collection(false);
        c.create(json!({ "_id": "fixed" })).unwrap();
        let err = c.create(json!({ "_id": "fixed" })).unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[test]
    fn test_find_by_id_returns_independent_copy() {
        let c = collection(false);
        let doc = c.create(json!({ "arr": ["a"] })).unwrap();

        let mut copy = c.find_by_id(doc.id()).unwrap().unwrap();
        copy.push("arr", json!("b")).unwrap();
        c.save(&mut copy).unwrap();

        let reloaded = c.find_by_id(doc.id()).unwrap().unwrap();
        assert_eq!(reloaded.get("arr"), Some(&json!(["a", "b"])));
        assert_eq!(reloaded.version(), 1);
        assert_eq!(doc.get("arr"), Some(&json!(["a"])));
        assert!(c.find_by_id("absent").unwrap().is_none());
    }

    #[test]
    fn test_push_applies_to_stored_array() {
        let c = collection(false);
        let doc = c.create(json!({})).unwrap();

        let mut first = c.find_by_id(doc.id()).unwrap().unwrap();
        let mut second = c.find_by_id(doc.id()).unwrap().unwrap();
        first.push("arr", json!("x")).unwrap();
        second.push("arr", json!("y")).unwrap();
        c.save(&mut first).unwrap();
        c.save(&mut second).unwrap();

        let stored = c.find_by_id(doc.id()).unwrap().unwrap();
        assert_eq!(stored.get("arr"), Some(&json!(["x", "y"])));
        assert_eq!(stored.version(), 2);
    }

    #[test]
    fn test_stale_array_replace_conflicts() {
        let c = collection(false);
        let doc = c.create(json!({})).unwrap();

        let mut first = c.find_by_id(doc.id()).unwrap().unwrap();
        let mut second = c.find_by_id(doc.id()).unwrap().unwrap();
        first.set("arr", json!(["x"])).unwrap();
        c.save(&mut first).unwrap();

        second.set("arr", json!(["y"])).unwrap();
        let err = c.save(&mut second).unwrap_err();
        assert!(err.is_version_conflict());
        assert!(err.to_string().contains("No matching document"));
        assert!(second.has_changes());
    }

    #[test]
    fn test_scalar_set_keeps_version() {
        let c = collection(false);
        let mut doc = c.create(json!({})).unwrap();
        doc.set("name", json!("n")).unwrap();
        c.save(&mut doc).unwrap();

        let stored = c.find_by_id(doc.id()).unwrap().unwrap();
        assert_eq!(stored.version(), 0);
        assert_eq!(stored.get("name"), Some(&json!("n")));
    }

    #[test]
    fn test_validation_failure_writes_nothing() {
        let c = collection(false);
        let mut doc = c.create(json!({})).unwrap();
        doc.set("name", json!(5)).unwrap();

        let err = c.save(&mut doc).unwrap_err();
        assert!(err.validation_errors().unwrap().get("name").is_some());
        let stored = c.find_by_id(doc.id()).unwrap().unwrap();
        assert!(stored.get("name").is_none());
    }

    #[test]
    fn test_save_of_deleted_copy() {
        let c = collection(false);
        let mut doc = c.new_document(json!({})).unwrap();
        doc.mark_saved();
        doc.push("arr", json!("x")).unwrap();
        assert!(matches!(
            c.save(&mut doc),
            Err(StoreError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_unique_index_across_documents() {
        let c = collection(true);
        c.create(json!({ "arr": ["test"] })).unwrap();

        let err = c.create(json!({ "arr": ["test"] })).unwrap_err();
        assert!(err.is_duplicate_key());
        assert!(err.to_string().contains("arr_1"));
        assert_eq!(c.count().unwrap(), 1);
    }

    #[test]
    fn test_no_index_by_default() {
        let c = collection(false);
        c.create(json!({ "arr": ["test"] })).unwrap();
        c.create(json!({ "arr": ["test"] })).unwrap();
        assert_eq!(c.count().unwrap(), 2);
    }

    #[test]
    fn test_apply_push_creates_missing_array() {
        let mut body = Map::new();
        apply(
            &mut body,
            &Modification::Push {
                path: "profile.tags".into(),
                values: vec![json!("a")],
            },
        )
        .unwrap();
        assert_eq!(body["profile"]["tags"], json!(["a"]));
    }
}
