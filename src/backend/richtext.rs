//! Markdown to richtext conversion over HTTP.
//!
//! The converter is a small function service wrapping the destination's
//! markdown parser. It accepts `{"markdown": "..."}` and answers either with
//! the document itself or with a `{"statusCode": .., "body": "<json>"}`
//! envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::traits::{ConversionError, MarkdownConverter};

/// HTTP markdown converter.
pub struct HttpRichTextConverter {
    client: Client,
    endpoint: String,
}

impl HttpRichTextConverter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ConversionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConversionError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Extract the richtext document from a converter response.
    pub fn unwrap_document(payload: Value) -> Result<Value, ConversionError> {
        let is_envelope = payload
            .as_object()
            .is_some_and(|obj| obj.contains_key("statusCode") && obj.contains_key("body"));
        if !is_envelope {
            return Ok(payload);
        }

        let status = payload["statusCode"].as_u64().unwrap_or(0);
        let body = &payload["body"];
        if status != 200 {
            return Err(ConversionError::Failed {
                status: u16::try_from(status).unwrap_or(u16::MAX),
                message: body.to_string(),
            });
        }

        match body {
            Value::String(text) => serde_json::from_str(text)
                .map_err(|e| ConversionError::InvalidResponse(format!("body is not JSON: {}", e))),
            other => Ok(other.clone()),
        }
    }
}

#[async_trait]
impl MarkdownConverter for HttpRichTextConverter {
    async fn convert(&self, markdown: &str) -> Result<Value, ConversionError> {
        debug!(bytes = markdown.len(), "Converting markdown to richtext");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "markdown": markdown }))
            .send()
            .await
            .map_err(|e| ConversionError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ConversionError::Failed { status, message });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ConversionError::InvalidResponse(e.to_string()))?;

        let document = Self::unwrap_document(payload)?;
        debug!(%document, "Converted richtext");
        Ok(document)
    }
}
