//! Observability
//!
//! Structured logging goes through `tracing`; this module only names the
//! events. The crate never installs a subscriber.
//!
//! # Usage
//!
//! ```ignore
//! tracing::info!(event = Event::DocumentSaved.as_str(), id = %id, version, "document saved");
//! ```

mod events;

pub use events::Event;
