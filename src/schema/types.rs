//! Schema type definitions
//!
//! Supported types:
//! - string: UTF-8 string
//! - int: 64-bit signed integer
//! - bool: Boolean
//! - float: 64-bit floating point
//! - object: Nested object with field schema
//! - array: Homogeneous array with element type
//!
//! Any field may carry a `unique` marking. See [`Schema::unique_markings`]
//! for how markings are interpreted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::errors::{SchemaError, SchemaResult};
use super::path::{lookup_value, make_path};

/// Supported field types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// Boolean
    Bool,
    /// 64-bit floating point
    Float,
    /// Nested object with its own field schema
    Object {
        /// Nested field definitions
        fields: HashMap<String, FieldDef>,
    },
    /// Homogeneous array with single element type
    Array {
        /// Element type (boxed to allow recursive types)
        #[serde(rename = "element_type")]
        element_type: Box<FieldType>,
    },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::Float => "float",
            FieldType::Object { .. } => "object",
            FieldType::Array { .. } => "array",
        }
    }

    /// Returns true for array types.
    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::Array { .. })
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field data type
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether field must be present
    pub required: bool,
    /// Unique marking
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
}

impl FieldDef {
    /// Create a field of the given type
    pub fn new(field_type: FieldType, required: bool) -> Self {
        Self {
            field_type,
            required,
            unique: false,
        }
    }

    /// Create a required string field
    pub fn required_string() -> Self {
        Self::new(FieldType::String, true)
    }

    /// Create an optional string field
    pub fn optional_string() -> Self {
        Self::new(FieldType::String, false)
    }

    /// Create a required int field
    pub fn required_int() -> Self {
        Self::new(FieldType::Int, true)
    }

    /// Create an optional int field
    pub fn optional_int() -> Self {
        Self::new(FieldType::Int, false)
    }

    /// Create a required bool field
    pub fn required_bool() -> Self {
        Self::new(FieldType::Bool, true)
    }

    /// Create an optional float field
    pub fn optional_float() -> Self {
        Self::new(FieldType::Float, false)
    }

    /// Create a required object field
    pub fn required_object(fields: HashMap<String, FieldDef>) -> Self {
        Self::new(FieldType::Object { fields }, true)
    }

    /// Create an optional object field
    pub fn optional_object(fields: HashMap<String, FieldDef>) -> Self {
        Self::new(FieldType::Object { fields }, false)
    }

    /// Create an optional array field
    pub fn optional_array(element_type: FieldType) -> Self {
        Self::new(
            FieldType::Array {
                element_type: Box::new(element_type),
            },
            false,
        )
    }

    /// Create an optional array of objects with the given entry fields
    pub fn object_array(fields: HashMap<String, FieldDef>) -> Self {
        Self::optional_array(FieldType::Object { fields })
    }

    /// Marks this field unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A compiled `unique` marking.
///
/// - `arr: [string]` marked unique: path `arr`, array `arr`, no key
/// - `docArr: [{ name }]` with `name` marked unique: path `docArr.name`,
///   array `docArr`, key `name`
/// - `email: string` marked unique: path `email`, no array, no key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueMarking {
    /// Full dotted path of the marked field
    pub path: String,
    /// Path of the enclosing array, if any
    pub array: Option<String>,
    /// Sub-field key within array entries, if any
    pub key: Option<String>,
}

impl UniqueMarking {
    /// Returns true if the marking asks for per-document array uniqueness.
    pub fn is_array_marking(&self) -> bool {
        self.array.is_some()
    }

    /// Extracts the marked values from a document, in array order.
    ///
    /// Entries missing the sub-field, or holding null there, are skipped.
    pub fn values<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        let array_path = match &self.array {
            Some(array_path) => array_path,
            None => {
                return lookup_value(document, &self.path)
                    .filter(|v| !v.is_null())
                    .into_iter()
                    .collect();
            }
        };

        let entries = match lookup_value(document, array_path).and_then(Value::as_array) {
            Some(entries) => entries,
            None => return Vec::new(),
        };

        match &self.key {
            None => entries.iter().collect(),
            Some(key) => entries
                .iter()
                .filter_map(|entry| lookup_value(entry, key))
                .filter(|v| !v.is_null())
                .collect(),
        }
    }
}

/// Complete schema definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Unique schema identifier
    pub schema_id: String,
    /// Schema version (monotonic or semantic)
    pub schema_version: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Field definitions
    pub fields: HashMap<String, FieldDef>,
}

impl Schema {
    /// Create a new schema
    pub fn new(
        schema_id: impl Into<String>,
        schema_version: impl Into<String>,
        fields: HashMap<String, FieldDef>,
    ) -> Self {
        Self {
            schema_id: schema_id.into(),
            schema_version: schema_version.into(),
            description: None,
            fields,
        }
    }

    /// Returns the unique key for this schema (id, version)
    pub fn key(&self) -> (&str, &str) {
        (&self.schema_id, &self.schema_version)
    }

    /// Validates the schema structure itself (not a document)
    pub fn validate_structure(&self) -> Result<(), String> {
        match self.fields.get("_id") {
            None => Err("Schema must define an '_id' field".into()),
            Some(id_field) if !id_field.required => Err("'_id' field must be required".into()),
            Some(_) => Ok(()),
        }
    }

    /// Returns the top-level field definition for a dotted path, walking
    /// through nested objects.
    pub fn field(&self, path: &str) -> Option<&FieldDef> {
        let mut fields = &self.fields;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let def = fields.get(segment)?;
            if segments.peek().is_none() {
                return Some(def);
            }
            match &def.field_type {
                FieldType::Object { fields: nested } => fields = nested,
                _ => return None,
            }
        }
        None
    }

    /// Collects every `unique` marking in sorted path order.
    ///
    /// Rejects markings the array validator cannot honor: `unique` on an
    /// array of objects itself, and any marking below a second array level.
    pub fn unique_markings(&self) -> SchemaResult<Vec<UniqueMarking>> {
        let mut markings = Vec::new();
        collect_markings(&self.fields, "", &mut markings)?;
        Ok(markings)
    }

    /// Fills absent array fields with `[]`, walking present nested objects.
    pub fn apply_defaults(&self, doc: &mut Map<String, Value>) {
        apply_array_defaults(&self.fields, doc);
    }
}

fn sorted(fields: &HashMap<String, FieldDef>) -> Vec<(&String, &FieldDef)> {
    let mut entries: Vec<_> = fields.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn collect_markings(
    fields: &HashMap<String, FieldDef>,
    prefix: &str,
    out: &mut Vec<UniqueMarking>,
) -> SchemaResult<()> {
    for (name, def) in sorted(fields) {
        let path = make_path(prefix, name);
        match &def.field_type {
            FieldType::Array { element_type } => match element_type.as_ref() {
                FieldType::Object { fields: entry } => {
                    if def.unique {
                        return Err(SchemaError::unsupported_unique_path(
                            path,
                            "mark a sub-field of the entries unique instead of the array",
                        ));
                    }
                    collect_entry_markings(entry, &path, "", out)?;
                }
                FieldType::Array { .. } => {
                    if def.unique || type_has_unique(element_type) {
                        return Err(SchemaError::unsupported_unique_path(
                            path,
                            "nested arrays cannot carry unique markings",
                        ));
                    }
                }
                _ => {
                    if def.unique {
                        out.push(UniqueMarking {
                            path: path.clone(),
                            array: Some(path),
                            key: None,
                        });
                    }
                }
            },
            FieldType::Object { fields: nested } => {
                if def.unique {
                    return Err(SchemaError::unsupported_unique_path(
                        path,
                        "objects cannot be marked unique",
                    ));
                }
                collect_markings(nested, &path, out)?;
            }
            _ => {
                if def.unique {
                    out.push(UniqueMarking {
                        path,
                        array: None,
                        key: None,
                    });
                }
            }
        }
    }
    Ok(())
}

fn collect_entry_markings(
    fields: &HashMap<String, FieldDef>,
    array_path: &str,
    key_prefix: &str,
    out: &mut Vec<UniqueMarking>,
) -> SchemaResult<()> {
    for (name, def) in sorted(fields) {
        let key = make_path(key_prefix, name);
        match &def.field_type {
            FieldType::Object { fields: nested } => {
                if def.unique {
                    return Err(SchemaError::unsupported_unique_path(
                        make_path(array_path, &key),
                        "objects cannot be marked unique",
                    ));
                }
                collect_entry_markings(nested, array_path, &key, out)?;
            }
            FieldType::Array { .. } => {
                if def.unique || type_has_unique(&def.field_type) {
                    return Err(SchemaError::unsupported_unique_path(
                        make_path(array_path, &key),
                        "nested arrays cannot carry unique markings",
                    ));
                }
            }
            _ => {
                if def.unique {
                    out.push(UniqueMarking {
                        path: make_path(array_path, &key),
                        array: Some(array_path.to_string()),
                        key: Some(key),
                    });
                }
            }
        }
    }
    Ok(())
}

fn type_has_unique(field_type: &FieldType) -> bool {
    match field_type {
        FieldType::Object { fields } => fields
            .values()
            .any(|def| def.unique || type_has_unique(&def.field_type)),
        FieldType::Array { element_type } => type_has_unique(element_type),
        _ => false,
    }
}

fn apply_array_defaults(fields: &HashMap<String, FieldDef>, doc: &mut Map<String, Value>) {
    for (name, def) in fields {
        match &def.field_type {
            FieldType::Array { .. } => {
                doc.entry(name.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
            }
            FieldType::Object { fields: nested } => {
                if let Some(Value::Object(obj)) = doc.get_mut(name) {
                    apply_array_defaults(nested, obj);
                }
            }
            _ => {}
        }
    }
}
