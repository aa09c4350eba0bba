//! Reference resolution
//!
//! Source references carry the linked record's slug (`{"slug": "..."}`, or a
//! list of those). Each slug is looked up among the destination's existing
//! entries of the referenced content type and replaced by an entry link.
//!
//! Lookup policy: the first entry returned wins; no match is an error. The
//! referenced entries therefore have to be migrated before the records that
//! point at them.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::EntryLookup;
use crate::error::{shape_of, MigrateError, Result};
use crate::model::Link;

/// Resolves slug references into destination entry links.
#[derive(Clone)]
pub struct ReferenceResolver {
    lookup: Arc<dyn EntryLookup>,
}

impl ReferenceResolver {
    pub fn new(lookup: Arc<dyn EntryLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve a raw reference value of `content_type` found in `locale`.
    ///
    /// A single descriptor yields a single link; a list yields a list of links
    /// in the same order.
    pub async fn resolve(&self, content_type: &str, locale: &str, raw: &Value) -> Result<Value> {
        match raw {
            Value::Array(descriptors) => {
                let mut links = Vec::with_capacity(descriptors.len());
                for descriptor in descriptors {
                    let slug = descriptor_slug(content_type, locale, descriptor)?;
                    links.push(self.resolve_slug(content_type, slug).await?.to_value());
                }
                Ok(Value::Array(links))
            }
            descriptor => {
                let slug = descriptor_slug(content_type, locale, descriptor)?;
                Ok(self.resolve_slug(content_type, slug).await?.to_value())
            }
        }
    }

    /// Link to the first `content_type` entry whose slug is `slug`.
    pub async fn resolve_slug(&self, content_type: &str, slug: &str) -> Result<Link> {
        let ids = self.lookup.find_entries(content_type, slug).await?;
        if ids.len() > 1 {
            warn!(content_type, slug, matches = ids.len(), "Several entries match, using the first");
        }
        let id = ids
            .into_iter()
            .next()
            .ok_or_else(|| MigrateError::ReferenceNotFound {
                content_type: content_type.to_string(),
                slug: slug.to_string(),
            })?;
        debug!(content_type, slug, %id, "Resolved reference");
        Ok(Link::entry(id))
    }
}

fn descriptor_slug<'a>(field: &str, locale: &str, descriptor: &'a Value) -> Result<&'a str> {
    descriptor
        .get("slug")
        .and_then(Value::as_str)
        .ok_or_else(|| MigrateError::UnexpectedShape {
            field: field.to_string(),
            locale: locale.to_string(),
            expected: "{slug} or a list of {slug}",
            actual: shape_of(descriptor),
        })
}
