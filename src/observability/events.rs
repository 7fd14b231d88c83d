//! Observable events
//!
//! Events are explicit and typed. Each is emitted as a `tracing` event with
//! an `event` field holding [`Event::as_str`].

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Schema compilation
    /// A plugin was applied to a schema
    SchemaCompiled,
    /// A unique array validator was attached to a path
    UniqueValidatorAttached,

    // Validation
    /// A document was rejected for repeated array values
    DuplicateValuesRejected,
    /// A document failed validation
    ValidationFailed,

    // Persistence
    /// A document was inserted
    DocumentCreated,
    /// A document update was committed
    DocumentSaved,
    /// A save hit a stale version
    VersionConflict,
    /// A save hit a cross-document unique index
    DuplicateKey,
}

impl Event {
    /// Returns the event name used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemaCompiled => "SCHEMA_COMPILED",
            Event::UniqueValidatorAttached => "UNIQUE_VALIDATOR_ATTACHED",
            Event::DuplicateValuesRejected => "DUPLICATE_VALUES_REJECTED",
            Event::ValidationFailed => "VALIDATION_FAILED",
            Event::DocumentCreated => "DOCUMENT_CREATED",
            Event::DocumentSaved => "DOCUMENT_SAVED",
            Event::VersionConflict => "VERSION_CONFLICT",
            Event::DuplicateKey => "DUPLICATE_KEY",
        }
    }

    /// Returns true for events that mean a write was refused
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Event::DuplicateValuesRejected
                | Event::ValidationFailed
                | Event::VersionConflict
                | Event::DuplicateKey
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
