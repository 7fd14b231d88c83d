//! Compiled schemas: a schema plus the behavior plugins attach to it.
//!
//! Plugins run once, at compile time, and register path validators and
//! pre-save hooks. Nothing is looked up dynamically at save time.

use serde_json::Value;
use std::fmt;

use tracing::info;

use super::errors::{SchemaResult, ValidationErrors};
use super::types::Schema;
use super::validator::check_structure;
use crate::observability::Event;
use crate::store::Document;

/// A validation rule bound to one schema path.
pub trait PathValidator: Send + Sync {
    /// Path the rule's errors are keyed by.
    fn path(&self) -> &str;

    /// Checks the full in-memory document.
    fn validate(&self, document: &Value) -> SchemaResult<()>;
}

/// Runs against a document copy before it is validated and persisted.
pub trait SaveHook: Send + Sync {
    fn pre_save(&self, document: &mut Document);
}

/// Extends a schema at compile time.
pub trait SchemaPlugin {
    fn name(&self) -> &'static str;

    fn apply(&self, compiled: &mut CompiledSchema) -> SchemaResult<()>;
}

/// A schema with its attached validators and hooks.
pub struct CompiledSchema {
    schema: Schema,
    validators: Vec<Box<dyn PathValidator>>,
    hooks: Vec<Box<dyn SaveHook>>,
}

impl CompiledSchema {
    /// Compiles a schema with no plugins attached.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            validators: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Applies a plugin, consuming and returning the compiled schema.
    pub fn with_plugin(mut self, plugin: &dyn SchemaPlugin) -> SchemaResult<Self> {
        self.plugin(plugin)?;
        Ok(self)
    }

    /// Applies a plugin in place.
    pub fn plugin(&mut self, plugin: &dyn SchemaPlugin) -> SchemaResult<()> {
        let before = self.validators.len();
        plugin
            .apply(self)
            .map_err(|e| e.with_schema(&self.schema.schema_id, &self.schema.schema_version))?;

        info!(
            event = Event::SchemaCompiled.as_str(),
            schema_id = %self.schema.schema_id,
            schema_version = %self.schema.schema_version,
            plugin = plugin.name(),
            validators = self.validators.len() - before,
            "plugin applied"
        );
        Ok(())
    }

    pub fn add_validator(&mut self, validator: Box<dyn PathValidator>) {
        self.validators.push(validator);
    }

    pub fn add_hook(&mut self, hook: Box<dyn SaveHook>) {
        self.hooks.push(hook);
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn validators(&self) -> &[Box<dyn PathValidator>] {
        &self.validators
    }

    pub fn hooks(&self) -> &[Box<dyn SaveHook>] {
        &self.hooks
    }

    /// Validates a document: the structural check first, then every attached
    /// path validator. All failures are collected, keyed by path.
    pub fn validate(&self, document: &Value) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(err) = check_structure(&self.schema, document) {
            let path = err.path().unwrap_or("$root").to_string();
            errors.insert(path, err);
        }

        for validator in &self.validators {
            if let Err(err) = validator.validate(document) {
                errors.insert(validator.path(), err);
            }
        }

        errors.into_result()
    }

    /// Runs every pre-save hook in registration order.
    pub fn run_pre_save(&self, document: &mut Document) {
        for hook in &self.hooks {
            hook.pre_save(document);
        }
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("schema_id", &self.schema.schema_id)
            .field("schema_version", &self.schema.schema_version)
            .field(
                "validators",
                &self.validators.iter().map(|v| v.path()).collect::<Vec<_>>(),
            )
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
