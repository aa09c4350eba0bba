//! Core traits for the external collaborators of a migration run.
//!
//! The pipeline only ever talks to these traits; the HTTP implementations
//! live next to them and the in-memory ones in [`super::mock`].

use async_trait::async_trait;
use serde_json::Value;

use crate::model::DestinationEntry;

/// Errors from the parameter/secret store.
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    /// No parameter with this name
    #[error("Parameter not found: {0}")]
    Missing(String),

    /// Parameter file could not be read
    #[error("Failed to read parameter file {path}: {message}")]
    Io { path: String, message: String },

    /// Parameter file is not a table of strings
    #[error("Failed to parse parameter file {path}: {message}")]
    Parse { path: String, message: String },
}

/// Errors from the source content API.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// GraphQL returned errors
    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    /// Response did not contain the expected collection
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from the markdown to richtext conversion service.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Converter reported a failure
    #[error("Conversion failed with status {status}: {message}")]
    Failed { status: u16, message: String },

    /// Converter response could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from the destination management and delivery APIs.
#[derive(Debug, thiserror::Error)]
pub enum DestinationError {
    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limited by the API
    #[error("Rate limited")]
    RateLimited,

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success HTTP status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Response could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Key/value lookup for job parameters and secrets.
pub trait ParameterStore: Send + Sync {
    /// Get the value of a parameter.
    fn get(&self, name: &str) -> Result<String, ParameterError>;
}

/// Query access to the source CMS.
#[async_trait]
pub trait SourceQuery: Send + Sync {
    /// All records of `model` in `locale`, each a JSON object holding the
    /// fields named by `selection`.
    async fn query_locale(
        &self,
        model: &str,
        locale: &str,
        selection: &str,
    ) -> Result<Vec<Value>, SourceError>;
}

/// Markdown to richtext conversion.
#[async_trait]
pub trait MarkdownConverter: Send + Sync {
    /// Convert markdown text into a structured richtext document.
    async fn convert(&self, markdown: &str) -> Result<Value, ConversionError>;
}

/// Lookup of existing destination entries by natural key.
#[async_trait]
pub trait EntryLookup: Send + Sync {
    /// Ids of entries of `content_type` whose slug is exactly `slug`, in the
    /// order returned by the API.
    async fn find_entries(
        &self,
        content_type: &str,
        slug: &str,
    ) -> Result<Vec<String>, DestinationError>;
}

/// Reference to an entry that exists in the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHandle {
    /// Destination-assigned id
    pub id: String,
    /// Current version, required for updates and publishing
    pub version: u64,
}

/// Write access to the destination CMS.
#[async_trait]
pub trait EntryWriter: Send + Sync {
    /// Create a draft entry.
    async fn create(&self, entry: &DestinationEntry) -> Result<EntryHandle, DestinationError>;

    /// Save the entry's fields onto an existing draft.
    async fn save(
        &self,
        handle: &EntryHandle,
        entry: &DestinationEntry,
    ) -> Result<EntryHandle, DestinationError>;

    /// Publish the current version of an entry.
    async fn publish(&self, handle: &EntryHandle) -> Result<EntryHandle, DestinationError>;
}
