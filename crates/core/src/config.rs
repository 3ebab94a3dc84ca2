//! Cache configuration.
//!
//! Controls how entities are identified and how absent data is classified
//! when computing partial status.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// Separator between values of a multi-field primary key.
pub const KEY_SEPARATOR: &str = "__";

/// Per-type configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeConfig {
    /// Fields forming the primary key of this type.
    #[serde(default)]
    pub keys: Vec<String>,
}

/// Configuration of a cache instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Primary key fields for types without an entry in `types`.
    pub default_keys: Vec<String>,
    /// Per-type overrides.
    pub types: BTreeMap<String, TypeConfig>,
    /// Whether a never-written nullable field makes a read partial.
    ///
    /// An explicit null stored on a nullable field is always complete.
    pub nullable_absent_is_partial: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_keys: vec!["id".into()],
            types: BTreeMap::new(),
            nullable_absent_is_partial: true,
        }
    }
}

impl CacheConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json(source: &str) -> Result<Self> {
        let config: CacheConfig =
            serde_json::from_str(source).map_err(|e| Error::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.default_keys.is_empty() {
            return Err(Error::invalid_config("defaultKeys must not be empty"));
        }
        for (typename, type_config) in &self.types {
            if type_config.keys.is_empty() {
                return Err(Error::invalid_config(format!(
                    "keys for type {} must not be empty",
                    typename
                )));
            }
        }
        Ok(())
    }

    /// Overrides the primary key fields of a type.
    pub fn with_keys(mut self, typename: impl Into<String>, keys: &[&str]) -> Self {
        self.types.insert(
            typename.into(),
            TypeConfig {
                keys: keys.iter().map(|k| k.to_string()).collect(),
            },
        );
        self
    }

    /// Returns the primary key fields of a type.
    pub fn keys_for(&self, typename: &str) -> &[String] {
        self.types
            .get(typename)
            .map(|t| t.keys.as_slice())
            .unwrap_or(&self.default_keys)
    }

    /// Computes the primary key of an object, or None if any key field is
    /// missing or null.
    pub fn compute_id(&self, typename: &str, object: &Map<String, JsonValue>) -> Option<String> {
        let mut parts = Vec::new();
        for key in self.keys_for(typename) {
            match object.get(key) {
                None | Some(JsonValue::Null) => return None,
                Some(JsonValue::String(s)) => parts.push(s.clone()),
                Some(other) => parts.push(other.to_string()),
            }
        }
        Some(parts.join(KEY_SEPARATOR))
    }
}
