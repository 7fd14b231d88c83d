//! Configuration file structure
//!
//! ```json
//! {
//!   "plugin": { "message": "Duplicate values in array `{PATH}`: [{VALUE}]", "force_versioning": true },
//!   "collection": { "auto_index": false }
//! }
//! ```
//!
//! Every field is optional; absent fields take the defaults below.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default duplicate-values message. `{PATH}` and `{VALUE}` are substituted.
pub const DEFAULT_MESSAGE: &str = "Duplicate values in array `{PATH}`: [{VALUE}]";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub plugin: PluginConfig,

    #[serde(default)]
    pub collection: CollectionConfig,
}

impl Config {
    /// Loads configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Array-uniqueness plugin options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Message template for duplicate values
    #[serde(default = "default_message")]
    pub message: String,

    /// Require a matching stored version when a guarded array was modified
    #[serde(default = "default_force_versioning")]
    pub force_versioning: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            message: default_message(),
            force_versioning: default_force_versioning(),
        }
    }
}

/// Collection options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Build cross-document unique indexes from `unique` markings
    #[serde(default)]
    pub auto_index: bool,
}

fn default_message() -> String {
    DEFAULT_MESSAGE.to_string()
}

fn default_force_versioning() -> bool {
    true
}
