//! Hygraph GraphQL content API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::traits::{SourceError, SourceQuery};

/// Largest result set requested per locale; larger models are truncated.
pub const MAX_RECORDS: u32 = 1000;

/// Hygraph content API client.
pub struct HygraphClient {
    client: Client,
    endpoint: String,
    token: String,
    first: u32,
}

impl HygraphClient {
    /// Create a client for a project content API endpoint.
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
            first: MAX_RECORDS,
        })
    }

    /// Override the per-query record limit.
    pub fn with_first(mut self, first: u32) -> Self {
        self.first = first;
        self
    }

    /// Name of the collection field Hygraph exposes for a model.
    pub fn collection_name(model: &str) -> String {
        format!("{}s", model)
    }

    /// GraphQL query for all records of a model in one locale.
    pub fn build_query(model: &str, locale: &str, selection: &str, first: u32) -> String {
        format!(
            "query sourceQuery {{\n  {}(locales: {}, first: {}) {{\n    {}\n  }}\n}}\n",
            Self::collection_name(model),
            locale,
            first,
            selection
        )
    }
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[async_trait]
impl SourceQuery for HygraphClient {
    async fn query_locale(
        &self,
        model: &str,
        locale: &str,
        selection: &str,
    ) -> Result<Vec<Value>, SourceError> {
        let query = Self::build_query(model, locale, selection, self.first);
        debug!(%query, "Hygraph query");

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&GraphQlRequest { query: &query })
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Server { status, message });
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        if !body.errors.is_empty() {
            let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(SourceError::GraphQl(messages.join("; ")));
        }

        let collection = Self::collection_name(model);
        let records = match body.data.and_then(|mut data| data.remove(&collection)) {
            Some(Value::Array(records)) => records,
            Some(other) => {
                return Err(SourceError::InvalidResponse(format!(
                    "{} is not a list: {}",
                    collection, other
                )))
            }
            None => {
                return Err(SourceError::InvalidResponse(format!(
                    "missing data.{}",
                    collection
                )))
            }
        };

        if records.len() as u64 >= u64::from(self.first) {
            warn!(
                model,
                locale,
                limit = self.first,
                "Result set reached the query limit, records beyond it are not migrated"
            );
        }

        Ok(records)
    }
}
