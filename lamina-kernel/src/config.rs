//! User configuration.
//!
//! A JSON file with optional `log_filter`, `submenus` and `actions`
//! sections. Declared submenus and actions are validated with the same
//! rules as built-in ones when the registry is built.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::ActionRegistry;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LaminaConfig {
    /// Tracing filter directive, e.g. `lamina_kernel=debug`.
    pub log_filter: Option<String>,
    pub submenus: IndexMap<String, Value>,
    pub actions: IndexMap<String, Value>,
}

impl LaminaConfig {
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&source)
    }

    /// Build the registry this configuration describes.
    pub fn registry(&self) -> Result<ActionRegistry, ConfigError> {
        Ok(ActionRegistry::with_config(self)?)
    }
}
