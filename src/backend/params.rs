//! Parameter and secret lookup
//!
//! Job parameters (API keys, endpoints, per-model query selections and
//! transform specs) are looked up by name. They can come from a TOML file of
//! `name = "value"` pairs, from environment variables, or from both.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use super::traits::{ParameterError, ParameterStore};

/// Parameters loaded from a TOML file of string values.
#[derive(Debug, Clone, Default)]
pub struct FileParameterStore {
    values: HashMap<String, String>,
}

impl FileParameterStore {
    /// Load parameters from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ParameterError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParameterError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content).map_err(|message| ParameterError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    /// Parse parameters from TOML text. Every value must be a string.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let table: toml::Table = toml::from_str(content).map_err(|e| e.to_string())?;
        let mut values = HashMap::with_capacity(table.len());
        for (name, value) in table {
            match value {
                toml::Value::String(s) => {
                    values.insert(name, s);
                }
                other => {
                    return Err(format!(
                        "parameter {} must be a string, got {}",
                        name,
                        other.type_str()
                    ))
                }
            }
        }
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ParameterStore for FileParameterStore {
    fn get(&self, name: &str) -> Result<String, ParameterError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| ParameterError::Missing(name.to_string()))
    }
}

/// Parameters read from environment variables.
///
/// `hygraph_query_venue` is looked up as `HYGRAPH_QUERY_VENUE`, or
/// `MIGRATE_HYGRAPH_QUERY_VENUE` with prefix `MIGRATE_`.
#[derive(Debug, Clone, Default)]
pub struct EnvParameterStore {
    prefix: String,
}

impl EnvParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable name for a parameter.
    pub fn var_name(&self, name: &str) -> String {
        let mapped: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{}", self.prefix, mapped)
    }
}

impl ParameterStore for EnvParameterStore {
    fn get(&self, name: &str) -> Result<String, ParameterError> {
        let var = self.var_name(name);
        std::env::var(&var).map_err(|_| ParameterError::Missing(name.to_string()))
    }
}

/// Tries each store in order; the first one holding the parameter wins.
#[derive(Default)]
pub struct ChainedParameterStore {
    stores: Vec<Box<dyn ParameterStore>>,
}

impl ChainedParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: impl ParameterStore + 'static) -> Self {
        self.stores.push(Box::new(store));
        self
    }
}

impl ParameterStore for ChainedParameterStore {
    fn get(&self, name: &str) -> Result<String, ParameterError> {
        for (index, store) in self.stores.iter().enumerate() {
            match store.get(name) {
                Ok(value) => {
                    debug!(parameter = name, store = index, "Resolved parameter");
                    return Ok(value);
                }
                Err(ParameterError::Missing(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(ParameterError::Missing(name.to_string()))
    }
}
