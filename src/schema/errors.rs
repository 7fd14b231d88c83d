//! Schema error types
//!
//! Error codes:
//! - SCHEMA_VALIDATION_FAILED (REJECT)
//! - SCHEMA_DUPLICATE_ARRAY_VALUE (REJECT)
//! - SCHEMA_UNSUPPORTED_UNIQUE_PATH (FATAL)

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
    /// Schema cannot be used at all
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Document violates the declared structure
    ValidationFailed,
    /// Array marked unique holds repeated values
    DuplicateArrayValue,
    /// Unique marking the array validator cannot honor
    UnsupportedUniquePath,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::ValidationFailed => "SCHEMA_VALIDATION_FAILED",
            SchemaErrorCode::DuplicateArrayValue => "SCHEMA_DUPLICATE_ARRAY_VALUE",
            SchemaErrorCode::UnsupportedUniquePath => "SCHEMA_UNSUPPORTED_UNIQUE_PATH",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::UnsupportedUniquePath => Severity::Fatal,
            SchemaErrorCode::ValidationFailed | SchemaErrorCode::DuplicateArrayValue => {
                Severity::Reject
            }
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Validation failure details
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationDetails {
    /// Field path (e.g., "user.address.city")
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "field to be present", "missing")
    }

    pub fn extra_field(field: impl Into<String>) -> Self {
        Self::new(field, "no undeclared fields", "extra field present")
    }

    pub fn type_mismatch(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::new(field, expected, actual)
    }

    pub fn null_value(field: impl Into<String>) -> Self {
        Self::new(field, "non-null value", "null")
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': expected {}, got {}", self.field, self.expected, self.actual)
    }
}

/// Schema error type with full context
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    schema_id: Option<String>,
    schema_version: Option<String>,
    details: Option<ValidationDetails>,
    /// Every occurrence of a repeated value, in array order
    duplicates: Vec<Value>,
}

impl SchemaError {
    fn bare(code: SchemaErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            schema_id: None,
            schema_version: None,
            details: None,
            duplicates: Vec::new(),
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(
        schema_id: impl Into<String>,
        schema_version: impl Into<String>,
        details: ValidationDetails,
    ) -> Self {
        let mut err = Self::bare(
            SchemaErrorCode::ValidationFailed,
            format!("Document validation failed: {}", details),
        );
        err.schema_id = Some(schema_id.into());
        err.schema_version = Some(schema_version.into());
        err.details = Some(details);
        err
    }

    /// Create a duplicate array value error.
    ///
    /// `message` is the already rendered human-readable text.
    pub fn duplicate_array_values(
        path: impl Into<String>,
        message: impl Into<String>,
        duplicates: Vec<Value>,
    ) -> Self {
        let path = path.into();
        let mut err = Self::bare(SchemaErrorCode::DuplicateArrayValue, message.into());
        err.details = Some(ValidationDetails::new(
            path,
            "unique array values",
            format!("{} duplicate entries", duplicates.len()),
        ));
        err.duplicates = duplicates;
        err
    }

    /// Create an error for a unique marking that cannot be enforced
    pub fn unsupported_unique_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        let path = path.into();
        let mut err = Self::bare(
            SchemaErrorCode::UnsupportedUniquePath,
            format!("Unsupported unique marking on '{}': {}", path, reason.into()),
        );
        err.details = Some(ValidationDetails::new(path, "array-level unique marking", "unsupported location"));
        err
    }

    /// Attaches the schema identity to an error raised without it.
    pub fn with_schema(mut self, schema_id: impl Into<String>, schema_version: impl Into<String>) -> Self {
        self.schema_id.get_or_insert_with(|| schema_id.into());
        self.schema_version.get_or_insert_with(|| schema_version.into());
        self
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the schema ID if applicable
    pub fn schema_id(&self) -> Option<&str> {
        self.schema_id.as_deref()
    }

    /// Returns the schema version if applicable
    pub fn schema_version(&self) -> Option<&str> {
        self.schema_version.as_deref()
    }

    /// Returns validation details if applicable
    pub fn details(&self) -> Option<&ValidationDetails> {
        self.details.as_ref()
    }

    /// Returns the repeated values for duplicate array errors
    pub fn duplicates(&self) -> &[Value] {
        &self.duplicates
    }

    /// Returns the field path the error is attached to, if any
    pub fn path(&self) -> Option<&str> {
        self.details.as_ref().map(|d| d.field.as_str())
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Every failure found while validating one document, keyed by field path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, SchemaError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error under `path`. The first error for a path wins.
    pub fn insert(&mut self, path: impl Into<String>, error: SchemaError) {
        self.errors.entry(path.into()).or_insert(error);
    }

    /// Returns the error attached to `path`
    pub fn get(&self, path: &str) -> Option<&SchemaError> {
        self.errors.get(path)
    }

    /// Returns the failing paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaError)> {
        self.errors.iter().map(|(path, err)| (path.as_str(), err))
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Converts into `Err(self)` when any error was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: ")?;
        for (i, (path, err)) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", path, err.message())?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
