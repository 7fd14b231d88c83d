//! The per-document array uniqueness rule.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::index::IndexKey;
use crate::observability::Event;
use crate::schema::{PathValidator, SchemaError, SchemaResult, UniqueMarking};

/// Rejects documents whose marked array holds a value more than once.
///
/// Scalars compare by value. For arrays of objects only the designated
/// sub-field is compared, never the whole entry.
///
/// Only the in-memory array is inspected. Appends issued concurrently from
/// stale copies of the same document are not visible here.
#[derive(Debug, Clone)]
pub struct UniqueArrayValidator {
    marking: UniqueMarking,
    message: String,
}

impl UniqueArrayValidator {
    /// `message` is a template; `{PATH}` and `{VALUE}` are substituted.
    pub fn new(marking: UniqueMarking, message: impl Into<String>) -> Self {
        Self {
            marking,
            message: message.into(),
        }
    }

    pub fn marking(&self) -> &UniqueMarking {
        &self.marking
    }

    /// Returns every occurrence of every repeated value, in array order.
    pub fn duplicates(&self, document: &Value) -> Vec<Value> {
        let values = self.marking.values(document);
        let keys: Vec<IndexKey> = values.iter().copied().map(IndexKey::from_json).collect();

        let mut counts: HashMap<&IndexKey, usize> = HashMap::with_capacity(keys.len());
        for key in &keys {
            *counts.entry(key).or_insert(0) += 1;
        }

        values
            .into_iter()
            .zip(&keys)
            .filter(|(_, key)| counts[key] > 1)
            .map(|(value, _)| value.clone())
            .collect()
    }

    /// Renders the failure message for the given repeated values.
    pub fn render_message(&self, duplicates: &[Value]) -> String {
        let listed: Vec<String> = duplicates.iter().map(display_value).collect();
        self.message
            .replace("{PATH}", &self.marking.path)
            .replace("{VALUE}", &listed.join(","))
    }
}

impl PathValidator for UniqueArrayValidator {
    fn path(&self) -> &str {
        &self.marking.path
    }

    fn validate(&self, document: &Value) -> SchemaResult<()> {
        let duplicates = self.duplicates(document);
        if duplicates.is_empty() {
            return Ok(());
        }

        let message = self.render_message(&duplicates);
        debug!(
            event = Event::DuplicateValuesRejected.as_str(),
            path = %self.marking.path,
            duplicates = duplicates.len(),
            "{}",
            message
        );
        Err(SchemaError::duplicate_array_values(
            &self.marking.path,
            message,
            duplicates,
        ))
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MESSAGE;
    use serde_json::json;

    fn scalar(path: &str) -> UniqueArrayValidator {
        UniqueArrayValidator::new(
            UniqueMarking {
                path: path.into(),
                array: Some(path.into()),
                key: None,
            },
            DEFAULT_MESSAGE,
        )
    }

    fn keyed(array: &str, key: &str) -> UniqueArrayValidator {
        UniqueArrayValidator::new(
            UniqueMarking {
                path: format!("{}.{}", array, key),
                array: Some(array.into()),
                key: Some(key.into()),
            },
            DEFAULT_MESSAGE,
        )
    }

    #[test]
    fn test_distinct_values_pass() {
        let v = scalar("arr");
        assert!(v.validate(&json!({ "arr": ["a", "b", "c"] })).is_ok());
        assert!(v.validate(&json!({ "arr": [] })).is_ok());
    }

    #[test]
    fn test_missing_array_passes() {
        assert!(scalar("arr").validate(&json!({ "_id": "x" })).is_ok());
    }

    #[test]
    fn test_repeated_value_message() {
        let err = scalar("arr")
            .validate(&json!({ "arr": ["test", "test"] }))
            .unwrap_err();
        assert_eq!(err.message(), "Duplicate values in array `arr`: [test,test]");
        assert_eq!(err.code().code(), "SCHEMA_DUPLICATE_ARRAY_VALUE");
        assert_eq!(err.path(), Some("arr"));
    }

    #[test]
    fn test_only_repeated_values_listed() {
        let v = scalar("arr");
        let doc = json!({ "arr": ["a", "b", "a", "c", "b", "d"] });
        assert_eq!(
            v.duplicates(&doc),
            vec![json!("a"), json!("b"), json!("a"), json!("b")]
        );
        let err = v.validate(&doc).unwrap_err();
        assert!(err.message().ends_with("[a,b,a,b]"));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let err = scalar("nums").validate(&json!({ "nums": [1, 2, 1.0] })).unwrap_err();
        assert!(err.message().ends_with("[1,1.0]"));

        assert!(scalar("nums").validate(&json!({ "nums": [1, "1"] })).is_ok());
    }

    #[test]
    fn test_large_unsigned_values_distinct() {
        let v = scalar("arr");
        let doc = json!({ "arr": [18446744073709551614u64, 18446744073709551615u64] });
        assert!(v.validate(&doc).is_ok());

        let doc = json!({ "arr": [18446744073709551615u64, 18446744073709551615u64] });
        assert!(v.validate(&doc).is_err());
    }

    #[test]
    fn test_subfield_comparison_only() {
        let v = keyed("docArr", "name");

        let doc = json!({ "docArr": [{ "name": "a", "n": 1 }, { "name": "a", "n": 2 }] });
        let err = v.validate(&doc).unwrap_err();
        assert_eq!(err.message(), "Duplicate values in array `docArr.name`: [a,a]");

        // identical entries apart from the key are still distinct
        let doc = json!({ "docArr": [{ "name": "a", "n": 1 }, { "name": "b", "n": 1 }] });
        assert!(v.validate(&doc).is_ok());
    }

    #[test]
    fn test_entries_without_key_are_skipped() {
        let v = keyed("docArr", "name");
        let doc = json!({ "docArr": [{}, {}, { "name": null }, { "name": "a" }] });
        assert!(v.validate(&doc).is_ok());
    }

    #[test]
    fn test_nested_key() {
        let v = keyed("members", "meta.handle");
        let doc = json!({ "members": [{ "meta": { "handle": "x" } }, { "meta": { "handle": "x" } }] });
        assert_eq!(v.duplicates(&doc), vec![json!("x"), json!("x")]);
    }

    #[test]
    fn test_custom_template() {
        let v = UniqueArrayValidator::new(
            UniqueMarking {
                path: "tags".into(),
                array: Some("tags".into()),
                key: None,
            },
            "{PATH} repeats {VALUE}",
        );
        let err = v.validate(&json!({ "tags": [true, true] })).unwrap_err();
        assert_eq!(err.message(), "tags repeats true,true");
    }
}
