//! Contentful management and delivery API client.
//!
//! Entry lookups go through the delivery API (published entries only), writes
//! through the management API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::traits::{DestinationError, EntryHandle, EntryLookup, EntryWriter};
use crate::model::DestinationEntry;

const MANAGEMENT_CONTENT_TYPE: &str = "application/vnd.contentful.management.v1+json";

/// Contentful connection settings.
#[derive(Clone)]
pub struct ContentfulConfig {
    /// Management API base URL
    pub management_url: String,
    /// Delivery API base URL
    pub delivery_url: String,
    /// Management API token
    pub management_token: String,
    /// Delivery API token
    pub delivery_token: String,
    /// Space id; the first space visible to the management token when unset
    pub space_id: Option<String>,
    /// Environment name
    pub environment: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ContentfulConfig {
    fn default() -> Self {
        Self {
            management_url: "https://api.contentful.com".to_string(),
            delivery_url: "https://cdn.contentful.com".to_string(),
            management_token: String::new(),
            delivery_token: String::new(),
            space_id: None,
            environment: "master".to_string(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for ContentfulConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentfulConfig")
            .field("management_url", &self.management_url)
            .field("delivery_url", &self.delivery_url)
            .field("management_token", &"<redacted>")
            .field("delivery_token", &"<redacted>")
            .field("space_id", &self.space_id)
            .field("environment", &self.environment)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Contentful client bound to one space and environment.
pub struct ContentfulClient {
    client: Client,
    config: ContentfulConfig,
    space_id: String,
}

#[derive(Debug, Deserialize)]
struct Sys {
    id: String,
    #[serde(default)]
    version: u64,
}

#[derive(Debug, Deserialize)]
struct Resource {
    sys: Sys,
}

#[derive(Debug, Deserialize)]
struct Collection {
    #[serde(default)]
    items: Vec<Resource>,
}

#[derive(Debug, Default, Deserialize)]
struct SlugFields {
    slug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlugEntry {
    sys: Sys,
    #[serde(default)]
    fields: SlugFields,
}

#[derive(Debug, Deserialize)]
struct SlugCollection {
    #[serde(default)]
    items: Vec<SlugEntry>,
}

impl ContentfulClient {
    /// Connect, discovering the space when none is configured.
    pub async fn connect(config: ContentfulConfig) -> Result<Self, DestinationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DestinationError::Network(e.to_string()))?;

        let space_id = match config.space_id.clone() {
            Some(id) => id,
            None => Self::discover_space(&client, &config).await?,
        };
        info!(space = %space_id, environment = %config.environment, "Using Contentful space");

        Ok(Self {
            client,
            config,
            space_id,
        })
    }

    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    async fn discover_space(
        client: &Client,
        config: &ContentfulConfig,
    ) -> Result<String, DestinationError> {
        let url = format!("{}/spaces", config.management_url);
        let request = client.get(&url).bearer_auth(&config.management_token);
        let spaces: Collection = Self::send(request).await?;
        spaces
            .items
            .into_iter()
            .next()
            .map(|space| space.sys.id)
            .ok_or_else(|| DestinationError::NotFound("no spaces visible to token".to_string()))
    }

    fn environment_url(&self, base: &str) -> String {
        format!(
            "{}/spaces/{}/environments/{}",
            base,
            urlencoding::encode(&self.space_id),
            urlencoding::encode(&self.config.environment)
        )
    }

    fn entry_url(&self, id: &str) -> String {
        format!(
            "{}/entries/{}",
            self.environment_url(&self.config.management_url),
            urlencoding::encode(id)
        )
    }

    fn management(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.management_token)
            .header(header::CONTENT_TYPE, MANAGEMENT_CONTENT_TYPE)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        request: RequestBuilder,
    ) -> Result<T, DestinationError> {
        let response = request
            .send()
            .await
            .map_err(|e| DestinationError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DestinationError::RateLimited);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(DestinationError::NotFound(response.url().path().to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DestinationError::Server {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| DestinationError::InvalidResponse(e.to_string()))
    }

    fn handle(resource: Resource) -> EntryHandle {
        EntryHandle {
            id: resource.sys.id,
            version: resource.sys.version,
        }
    }
}

#[async_trait]
impl EntryLookup for ContentfulClient {
    async fn find_entries(
        &self,
        content_type: &str,
        slug: &str,
    ) -> Result<Vec<String>, DestinationError> {
        let url = format!("{}/entries", self.environment_url(&self.config.delivery_url));
        let request = self
            .client
            .get(&url)
            .bearer_auth(&self.config.delivery_token)
            .query(&[
                ("content_type", content_type),
                ("fields.slug", slug),
                ("select", "sys.id,fields.slug"),
            ]);

        // Only entries whose slug is exactly `slug` count, in API order.
        let entries: SlugCollection = Self::send(request).await?;
        let returned = entries.items.len();
        let ids: Vec<String> = entries
            .items
            .into_iter()
            .filter(|e| e.fields.slug.as_deref() == Some(slug))
            .map(|e| e.sys.id)
            .collect();
        if ids.len() < returned {
            warn!(
                content_type,
                slug,
                dropped = returned - ids.len(),
                "Ignoring lookup results with a different slug"
            );
        }
        debug!(content_type, slug, matches = ids.len(), "Looked up entries");
        Ok(ids)
    }
}

#[async_trait]
impl EntryWriter for ContentfulClient {
    async fn create(&self, entry: &DestinationEntry) -> Result<EntryHandle, DestinationError> {
        let url = format!(
            "{}/entries",
            self.environment_url(&self.config.management_url)
        );
        let request = self
            .management(self.client.post(&url))
            .header("X-Contentful-Content-Type", &entry.content_type_id)
            .json(&json!({ "fields": entry.fields_json() }));

        let created: Resource = Self::send(request).await?;
        debug!(id = %created.sys.id, version = created.sys.version, "Created entry");
        Ok(Self::handle(created))
    }

    async fn save(
        &self,
        handle: &EntryHandle,
        entry: &DestinationEntry,
    ) -> Result<EntryHandle, DestinationError> {
        let request = self
            .management(self.client.put(self.entry_url(&handle.id)))
            .header("X-Contentful-Version", handle.version.to_string())
            .json(&json!({ "fields": entry.fields_json() }));

        let saved: Resource = Self::send(request).await?;
        debug!(id = %saved.sys.id, version = saved.sys.version, "Saved entry");
        Ok(Self::handle(saved))
    }

    async fn publish(&self, handle: &EntryHandle) -> Result<EntryHandle, DestinationError> {
        let url = format!("{}/published", self.entry_url(&handle.id));
        let request = self
            .management(self.client.put(&url))
            .header("X-Contentful-Version", handle.version.to_string());

        let published: Resource = Self::send(request).await?;
        debug!(id = %published.sys.id, version = published.sys.version, "Published entry");
        Ok(Self::handle(published))
    }
}
