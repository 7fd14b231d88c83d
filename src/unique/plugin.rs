//! Registration of the uniqueness rule against compiled schemas.

use tracing::{debug, info};

use super::validator::UniqueArrayValidator;
use crate::config::PluginConfig;
use crate::observability::Event;
use crate::schema::{CompiledSchema, SaveHook, SchemaPlugin, SchemaResult, UniqueMarking};
use crate::store::Document;

/// Attaches a [`UniqueArrayValidator`] to every array path marked unique.
///
/// Plain unique scalars are left alone; they only describe a cross-document
/// index.
#[derive(Debug, Clone, Default)]
pub struct ArrayUniquePlugin {
    config: PluginConfig,
}

impl ArrayUniquePlugin {
    pub fn new(config: PluginConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Builds the hook guarding each marked array once, if forced versioning is on.
    fn version_hook(&self, markings: &[UniqueMarking]) -> Option<ForceVersionHook> {
        if !self.config.force_versioning {
            return None;
        }

        let mut guarded: Vec<String> = Vec::new();
        for array in markings.iter().filter_map(|m| m.array.as_ref()) {
            if !guarded.contains(array) {
                guarded.push(array.clone());
            }
        }

        if guarded.is_empty() {
            None
        } else {
            Some(ForceVersionHook::new(guarded))
        }
    }
}

impl SchemaPlugin for ArrayUniquePlugin {
    fn name(&self) -> &'static str {
        "array-unique"
    }

    fn apply(&self, compiled: &mut CompiledSchema) -> SchemaResult<()> {
        let markings: Vec<UniqueMarking> = compiled
            .schema()
            .unique_markings()?
            .into_iter()
            .filter(UniqueMarking::is_array_marking)
            .collect();

        if let Some(hook) = self.version_hook(&markings) {
            compiled.add_hook(Box::new(hook));
        }

        for marking in markings {
            info!(
                event = Event::UniqueValidatorAttached.as_str(),
                path = %marking.path,
                key = marking.key.as_deref().unwrap_or(""),
                "unique array validator attached"
            );
            compiled.add_validator(Box::new(UniqueArrayValidator::new(
                marking,
                self.config.message.clone(),
            )));
        }

        Ok(())
    }
}

/// Forces a version match when a guarded array was modified.
///
/// Appends normally skip the version check, so two stale copies can each
/// append the same value and both persist. With this hook the second save
/// fails with a version conflict instead.
#[derive(Debug, Clone)]
pub struct ForceVersionHook {
    paths: Vec<String>,
}

impl ForceVersionHook {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

impl SaveHook for ForceVersionHook {
    fn pre_save(&self, document: &mut Document) {
        if document.is_new() {
            return;
        }
        if let Some(path) = self.paths.iter().find(|p| document.is_modified(p)) {
            debug!(id = %document.id(), path = %path, "forcing version check");
            document.increment();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldType, PathValidator, Schema};
    use crate::store::Versioning;
    use serde_json::json;
    use std::collections::HashMap;

    fn schema() -> Schema {
        let mut entry = HashMap::new();
        entry.insert("name".to_string(), FieldDef::optional_string().unique());
        entry.insert("label".to_string(), FieldDef::optional_string().unique());

        let mut fields = HashMap::new();
        fields.insert("_id".to_string(), FieldDef::required_string());
        fields.insert("arr".to_string(), FieldDef::optional_array(FieldType::String).unique());
        fields.insert("docArr".to_string(), FieldDef::object_array(entry));
        fields.insert("email".to_string(), FieldDef::optional_string().unique());
        fields.insert("plain".to_string(), FieldDef::optional_array(FieldType::Int));
        Schema::new("tests", "v1", fields)
    }

    #[test]
    fn test_one_validator_per_array_marking() {
        let compiled = CompiledSchema::new(schema())
            .with_plugin(&ArrayUniquePlugin::default())
            .unwrap();

        let paths: Vec<_> = compiled.validators().iter().map(|v| v.path()).collect();
        assert_eq!(paths, vec!["arr", "docArr.label", "docArr.name"]);
        assert_eq!(compiled.hooks().len(), 1);
    }

    #[test]
    fn test_hook_guards_each_array_once() {
        let plugin = ArrayUniquePlugin::default();
        let markings = schema().unique_markings().unwrap();
        assert_eq!(markings.len(), 4);

        // docArr carries two markings but is guarded once; scalar email is not guarded
        let hook = plugin.version_hook(&markings).unwrap();
        assert_eq!(hook.paths(), &["arr".to_string(), "docArr".to_string()]);
    }

    #[test]
    fn test_hook_forces_match_for_guarded_array_only() {
        let hook = ForceVersionHook::new(vec!["docArr".into()]);
        let body = json!({ "_id": "a", "docArr": [], "plain": [] });
        let stored = |body: &serde_json::Value| {
            Document::from_stored("a".into(), body.as_object().unwrap().clone(), 2)
        };

        let mut doc = stored(&body);
        doc.push("docArr", json!({ "name": "n" })).unwrap();
        hook.pre_save(&mut doc);
        assert_eq!(doc.versioning(), Versioning::MatchAndIncrement);

        let mut doc = stored(&body);
        doc.push("plain", json!(1)).unwrap();
        hook.pre_save(&mut doc);
        assert_eq!(doc.versioning(), Versioning::Increment);
    }

    #[test]
    fn test_no_hook_without_force_versioning() {
        let plugin = ArrayUniquePlugin::new(PluginConfig {
            force_versioning: false,
            ..PluginConfig::default()
        });
        let compiled = CompiledSchema::new(schema()).with_plugin(&plugin).unwrap();
        assert!(compiled.hooks().is_empty());
        assert_eq!(compiled.validators().len(), 3);
    }

    #[test]
    fn test_no_markings_no_hook() {
        let mut fields = HashMap::new();
        fields.insert("_id".to_string(), FieldDef::required_string());
        let compiled = CompiledSchema::new(Schema::new("bare", "v1", fields))
            .with_plugin(&ArrayUniquePlugin::default())
            .unwrap();
        assert!(compiled.validators().is_empty());
        assert!(compiled.hooks().is_empty());
    }

    #[test]
    fn test_compiled_validation_reports_all_paths() {
        let compiled = CompiledSchema::new(schema())
            .with_plugin(&ArrayUniquePlugin::default())
            .unwrap();

        let doc = json!({
            "_id": "a",
            "arr": ["x", "x"],
            "docArr": [{ "name": "n", "label": "l1" }, { "name": "n", "label": "l2" }]
        });
        let errors = compiled.validate(&doc).unwrap_err();
        assert_eq!(errors.paths().collect::<Vec<_>>(), vec!["arr", "docArr.name"]);
    }

    #[test]
    fn test_unsupported_marking_carries_schema_identity() {
        let mut fields = HashMap::new();
        fields.insert("_id".to_string(), FieldDef::required_string());
        fields.insert(
            "docArr".to_string(),
            FieldDef::object_array(HashMap::new()).unique(),
        );

        let err = CompiledSchema::new(Schema::new("bad", "v2", fields))
            .with_plugin(&ArrayUniquePlugin::default())
            .unwrap_err();
        assert_eq!(err.schema_id(), Some("bad"));
        assert_eq!(err.schema_version(), Some("v2"));
    }
}
