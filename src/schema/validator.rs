//! Structural document validation
//!
//! Validation semantics:
//! - All required fields are present
//! - No undeclared fields exist
//! - Field types exactly match schema types
//! - _id is present
//!
//! Rejected outright:
//! - Implicit type coercion
//! - Null values, including null array elements
//!
//! Per-path rules such as array uniqueness are not checked here; they are
//! attached to a [`CompiledSchema`](super::CompiledSchema) by plugins.

use serde_json::Value;
use std::collections::HashMap;

use super::errors::{SchemaError, SchemaResult, ValidationDetails};
use super::path::make_path;
use super::types::{FieldDef, FieldType, Schema};

/// Checks a document against the declared structure of `schema`.
///
/// Returns the first violation found.
pub fn check_structure(schema: &Schema, document: &Value) -> SchemaResult<()> {
    let checker = StructureChecker { schema };

    let doc_obj = document
        .as_object()
        .ok_or_else(|| checker.type_error("$root", "object", document))?;

    if !doc_obj.contains_key("_id") {
        return Err(checker.fail(ValidationDetails::missing_field("_id")));
    }

    checker.validate_object(doc_obj, &schema.fields, "")
}

struct StructureChecker<'s> {
    schema: &'s Schema,
}

impl StructureChecker<'_> {
    fn fail(&self, details: ValidationDetails) -> SchemaError {
        SchemaError::validation_failed(
            &self.schema.schema_id,
            &self.schema.schema_version,
            details,
        )
    }

    fn type_error(&self, field_path: &str, expected: &str, actual: &Value) -> SchemaError {
        self.fail(ValidationDetails::type_mismatch(
            field_path,
            expected,
            json_type_name(actual),
        ))
    }

    fn validate_object(
        &self,
        obj: &serde_json::Map<String, Value>,
        fields: &HashMap<String, FieldDef>,
        path_prefix: &str,
    ) -> SchemaResult<()> {
        for key in obj.keys() {
            if !fields.contains_key(key) {
                return Err(self.fail(ValidationDetails::extra_field(make_path(path_prefix, key))));
            }
        }

        let mut names: Vec<_> = fields.keys().collect();
        names.sort();

        for field_name in names {
            let field_def = &fields[field_name];
            let field_path = make_path(path_prefix, field_name);

            match obj.get(field_name) {
                Some(Value::Null) => {
                    return Err(self.fail(ValidationDetails::null_value(&field_path)));
                }
                Some(value) => self.validate_value(value, &field_def.field_type, &field_path)?,
                None if field_def.required => {
                    return Err(self.fail(ValidationDetails::missing_field(field_path)));
                }
                None => {}
            }
        }

        Ok(())
    }

    fn validate_value(
        &self,
        value: &Value,
        expected_type: &FieldType,
        field_path: &str,
    ) -> SchemaResult<()> {
        match expected_type {
            FieldType::String => {
                if !value.is_string() {
                    return Err(self.type_error(field_path, "string", value));
                }
            }
            FieldType::Int => {
                if !value.is_i64() && !value.is_u64() {
                    return Err(self.type_error(field_path, "int", value));
                }
            }
            FieldType::Bool => {
                if !value.is_boolean() {
                    return Err(self.type_error(field_path, "bool", value));
                }
            }
            FieldType::Float => {
                // Integers are acceptable floats
                if !value.is_number() {
                    return Err(self.type_error(field_path, "float", value));
                }
            }
            FieldType::Object { fields } => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| self.type_error(field_path, "object", value))?;
                self.validate_object(obj, fields, field_path)?;
            }
            FieldType::Array { element_type } => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| self.type_error(field_path, "array", value))?;

                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}[{}]", field_path, i);
                    if elem.is_null() {
                        return Err(self.fail(ValidationDetails::null_value(&elem_path)));
                    }
                    self.validate_value(elem, element_type, &elem_path)?;
                }
            }
        }

        Ok(())
    }
}

/// Returns the JSON type name for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
