//! Store errors

use thiserror::Error;

use crate::schema::{SchemaError, ValidationErrors};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    // ==================
    // Write rejections
    // ==================
    /// Document failed validation; nothing was written
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// Save against a stale copy: the stored version has moved on
    #[error(
        "No matching document found for id \"{id}\" version {version} modifiedPaths \"{}\"",
        .modified_paths.join(", ")
    )]
    VersionConflict {
        id: String,
        version: u64,
        modified_paths: Vec<String>,
    },

    /// Cross-document unique index violation
    #[error("E11000 duplicate key error collection: {collection} index: {index} dup key: {{ {path}: {key} }}")]
    DuplicateKey {
        collection: String,
        index: String,
        path: String,
        key: String,
    },

    /// Saved copy no longer exists
    #[error("No document found for id \"{0}\"")]
    DocumentNotFound(String),

    // ==================
    // Caller errors
    // ==================
    /// Push against a path that does not hold an array
    #[error("Cannot push to `{0}`: not an array")]
    NotAnArray(String),

    /// Malformed document or modification
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Schema could not be compiled for this collection
    #[error(transparent)]
    Schema(#[from] SchemaError),

    // ==================
    // Internal
    // ==================
    #[error("Collection lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Returns the validation failures, if this is a validation error
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            StoreError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    pub fn is_version_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }
}
