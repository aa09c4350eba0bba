//! Error types for the migration pipeline

use thiserror::Error;

use crate::backend::{ConversionError, DestinationError, ParameterError, SourceError};
use crate::config::ConfigError;

/// Migration error
#[derive(Debug, Error)]
pub enum MigrateError {
    /// A source record had no usable natural key
    #[error("Record in locale {locale} has no slug")]
    MissingNaturalKey { locale: String },

    /// No destination entry matched a referenced slug
    #[error("No {content_type} entry found for slug {slug}")]
    ReferenceNotFound { content_type: String, slug: String },

    /// A field value did not have the shape its kind requires
    #[error("Field {field} in locale {locale}: expected {expected}, got {actual}")]
    UnexpectedShape {
        field: String,
        locale: String,
        expected: &'static str,
        actual: String,
    },

    /// Parameter lookup failed
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Source query failed
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Markdown conversion failed
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Destination API failed
    #[error("Destination error: {0}")]
    Destination(#[from] DestinationError),
}

/// Result type for migration operations
pub type Result<T> = std::result::Result<T, MigrateError>;

/// Short description of a JSON value's shape, used in error messages.
pub(crate) fn shape_of(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(_) => "boolean".to_string(),
        serde_json::Value::Number(_) => "number".to_string(),
        serde_json::Value::String(_) => "string".to_string(),
        serde_json::Value::Array(items) => format!("array of {}", items.len()),
        serde_json::Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object {{{}}}", keys.join(", "))
        }
    }
}
