//! Job configuration
//!
//! Static settings come from an optional TOML file; secrets and per-model
//! settings are resolved by name through a [`ParameterStore`].

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{ParameterError, ParameterStore};

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid {what} JSON: {message}")]
    Json { what: String, message: String },

    #[error("Locale list is empty")]
    NoLocales,

    #[error("Field {field} is listed as both {first} and {second}")]
    OverlappingFieldSets {
        field: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub job: JobConfig,
    #[serde(default)]
    pub parameters: ParameterNames,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub destination: DestinationConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Run behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Sleep a small random delay before each request batch
    #[serde(default = "default_true")]
    pub throttle: bool,

    /// Build entries without writing them
    #[serde(default)]
    pub dry_run: bool,

    /// Record failing entries and keep going instead of aborting
    #[serde(default)]
    pub continue_on_error: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            throttle: true,
            dry_run: false,
            continue_on_error: false,
        }
    }
}

/// Names under which job parameters are stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterNames {
    #[serde(default = "default_hygraph_key")]
    pub hygraph_key: String,
    #[serde(default = "default_hygraph_api")]
    pub hygraph_api: String,
    #[serde(default = "default_contentful_mgmt_token")]
    pub contentful_mgmt_token: String,
    #[serde(default = "default_contentful_delivery_token")]
    pub contentful_delivery_token: String,
    #[serde(default = "default_contentful_env_name")]
    pub contentful_env_name: String,
    #[serde(default = "default_locales")]
    pub locales: String,
    /// Prefix of the per-model GraphQL selection parameter
    #[serde(default = "default_query_prefix")]
    pub query_prefix: String,
    /// Prefix of the per-model transform spec parameter
    #[serde(default = "default_transforms_prefix")]
    pub transforms_prefix: String,
}

impl Default for ParameterNames {
    fn default() -> Self {
        Self {
            hygraph_key: default_hygraph_key(),
            hygraph_api: default_hygraph_api(),
            contentful_mgmt_token: default_contentful_mgmt_token(),
            contentful_delivery_token: default_contentful_delivery_token(),
            contentful_env_name: default_contentful_env_name(),
            locales: default_locales(),
            query_prefix: default_query_prefix(),
            transforms_prefix: default_transforms_prefix(),
        }
    }
}

impl ParameterNames {
    pub fn query_for(&self, model: &str) -> String {
        format!("{}{}", self.query_prefix, model)
    }

    pub fn transforms_for(&self, model: &str) -> String {
        format!("{}{}", self.transforms_prefix, model)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Maximum records requested per locale
    #[serde(default = "default_first")]
    pub first: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            first: default_first(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Markdown to richtext converter endpoint
    #[serde(default = "default_converter_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            endpoint: default_converter_endpoint(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    #[serde(default = "default_management_url")]
    pub management_url: String,

    #[serde(default = "default_delivery_url")]
    pub delivery_url: String,

    /// Space id; the first visible space when unset
    #[serde(default)]
    pub space_id: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            management_url: default_management_url(),
            delivery_url: default_delivery_url(),
            space_id: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Field handling rules for one content model.
///
/// Parsed from the per-model JSON parameter:
/// `{"remap_fields": {"old": "new"}, "markdown_fields": [..],
///   "reference_fields": [..], "location_fields": [..]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSpec {
    #[serde(default)]
    pub remap_fields: IndexMap<String, String>,
    #[serde(default)]
    pub markdown_fields: Vec<String>,
    #[serde(default)]
    pub reference_fields: Vec<String>,
    #[serde(default)]
    pub location_fields: Vec<String>,
}

impl TransformSpec {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Json {
            what: "transform spec".to_string(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct LocaleList {
    locales: Vec<String>,
}

/// Parse the `{"locales": [...]}` parameter. Order is significant: the first
/// locale decides which records are migrated.
pub fn parse_locales(json: &str) -> Result<Vec<String>, ConfigError> {
    let list: LocaleList = serde_json::from_str(json).map_err(|e| ConfigError::Json {
        what: "locale list".to_string(),
        message: e.to_string(),
    })?;
    if list.locales.is_empty() {
        return Err(ConfigError::NoLocales);
    }
    Ok(list.locales)
}

/// Everything a run needs, resolved from the parameter store.
#[derive(Debug, Clone)]
pub struct ResolvedParameters {
    pub hygraph_key: String,
    pub hygraph_api: String,
    pub contentful_mgmt_token: String,
    pub contentful_delivery_token: String,
    pub contentful_env_name: String,
    pub locales: Vec<String>,
    pub query_fields: String,
    pub transforms: TransformSpec,
}

impl ResolvedParameters {
    /// Look up every parameter for `model`.
    pub fn resolve(
        store: &dyn ParameterStore,
        names: &ParameterNames,
        model: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            hygraph_key: store.get(&names.hygraph_key)?,
            hygraph_api: store.get(&names.hygraph_api)?,
            contentful_mgmt_token: store.get(&names.contentful_mgmt_token)?,
            contentful_delivery_token: store.get(&names.contentful_delivery_token)?,
            contentful_env_name: store.get(&names.contentful_env_name)?,
            locales: parse_locales(&store.get(&names.locales)?)?,
            query_fields: store.get(&names.query_for(model))?,
            transforms: TransformSpec::from_json(&store.get(&names.transforms_for(model))?)?,
        })
    }
}

// Defaults
fn default_true() -> bool { true }
fn default_hygraph_key() -> String { "hygraph_key".to_string() }
fn default_hygraph_api() -> String { "hygraph_api".to_string() }
fn default_contentful_mgmt_token() -> String { "contentful_mgmt_token".to_string() }
fn default_contentful_delivery_token() -> String { "contentful_delivery_token".to_string() }
fn default_contentful_env_name() -> String { "contentful_env_name".to_string() }
fn default_locales() -> String { "locales".to_string() }
fn default_query_prefix() -> String { "hygraph_query_".to_string() }
fn default_transforms_prefix() -> String { "transforms_".to_string() }
fn default_first() -> u32 { crate::backend::hygraph::MAX_RECORDS }
fn default_timeout() -> u64 { 30 }
fn default_converter_endpoint() -> String { "http://localhost:9000/convert".to_string() }
fn default_management_url() -> String { "https://api.contentful.com".to_string() }
fn default_delivery_url() -> String { "https://cdn.contentful.com".to_string() }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryParameterStore;

    #[test]
    fn test_transform_spec_parses_partial_json() {
        let spec = TransformSpec::from_json(
            r#"{"remap_fields": {"name": "title"}, "markdown_fields": ["body"]}"#,
        )
        .unwrap();
        assert_eq!(spec.remap_fields.get("name").map(String::as_str), Some("title"));
        assert_eq!(spec.markdown_fields, vec!["body".to_string()]);
        assert!(spec.reference_fields.is_empty());
        assert!(spec.location_fields.is_empty());
    }

    #[test]
    fn test_transform_spec_invalid_json() {
        assert!(matches!(
            TransformSpec::from_json("{not json"),
            Err(ConfigError::Json { .. })
        ));
    }

    #[test]
    fn test_parse_locales_keeps_order() {
        let locales = parse_locales(r#"{"locales": ["fr", "en", "de"]}"#).unwrap();
        assert_eq!(locales, vec!["fr", "en", "de"]);
    }

    #[test]
    fn test_parse_locales_empty() {
        assert!(matches!(
            parse_locales(r#"{"locales": []}"#),
            Err(ConfigError::NoLocales)
        ));
    }

    #[test]
    fn test_resolve_parameters() {
        let store = MemoryParameterStore::new()
            .with("hygraph_key", "hk")
            .with("hygraph_api", "https://hygraph.example/api")
            .with("contentful_mgmt_token", "cma")
            .with("contentful_delivery_token", "cda")
            .with("contentful_env_name", "staging")
            .with("locales", r#"{"locales": ["en"]}"#)
            .with("hygraph_query_venue", "slug title")
            .with("transforms_venue", r#"{"location_fields": ["position"]}"#);

        let resolved =
            ResolvedParameters::resolve(&store, &ParameterNames::default(), "venue").unwrap();
        assert_eq!(resolved.contentful_env_name, "staging");
        assert_eq!(resolved.locales, vec!["en"]);
        assert_eq!(resolved.query_fields, "slug title");
        assert_eq!(resolved.transforms.location_fields, vec!["position".to_string()]);
    }

    #[test]
    fn test_resolve_missing_parameter() {
        let store = MemoryParameterStore::new().with("hygraph_key", "hk");
        let result = ResolvedParameters::resolve(&store, &ParameterNames::default(), "venue");
        assert!(matches!(
            result,
            Err(ConfigError::Parameter(ParameterError::Missing(name))) if name == "hygraph_api"
        ));
    }
}
