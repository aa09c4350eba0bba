//! Record and entry structures flowing through the pipeline

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name to raw value, for one record in one locale.
pub type Fields = serde_json::Map<String, Value>;

/// Locale code to that locale's fields, in configured locale order.
pub type LocaleFields = IndexMap<String, Fields>;

/// Natural key to per-locale fields, in first-locale query order.
pub type MergedRecords = IndexMap<String, LocaleFields>;

/// How a field is handled by the transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Markdown converted to a richtext document
    Markdown,
    /// Slug reference(s) resolved to entry links
    Reference,
    /// `{latitude, longitude}` reshaped to `{lat, lon}`
    Location,
    /// Copied verbatim
    Plain,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Markdown => "markdown",
            FieldKind::Reference => "reference",
            FieldKind::Location => "location",
            FieldKind::Plain => "plain",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry ready for the destination management API.
///
/// `fields` maps field name to a locale map; a field may be present with an
/// empty locale map when no locale produced a value for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationEntry {
    pub content_type_id: String,
    pub fields: IndexMap<String, IndexMap<String, Value>>,
}

impl DestinationEntry {
    pub fn new(content_type_id: impl Into<String>) -> Self {
        Self {
            content_type_id: content_type_id.into(),
            fields: IndexMap::new(),
        }
    }

    /// Value stored for a field in a locale, if any.
    pub fn get(&self, field: &str, locale: &str) -> Option<&Value> {
        self.fields.get(field).and_then(|locales| locales.get(locale))
    }

    /// The `fields` object as sent in a create/update request body.
    pub fn fields_json(&self) -> Value {
        serde_json::json!(self.fields)
    }
}

/// Typed pointer to another entry by its destination id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub sys: LinkSys,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSys {
    #[serde(rename = "type")]
    pub sys_type: String,
    pub link_type: String,
    pub id: String,
}

impl Link {
    /// Link to an entry.
    pub fn entry(id: impl Into<String>) -> Self {
        Self {
            sys: LinkSys {
                sys_type: "Link".to_string(),
                link_type: "Entry".to_string(),
                id: id.into(),
            },
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "sys": {
                "type": self.sys.sys_type,
                "linkType": self.sys.link_type,
                "id": self.sys.id,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_link_shape() {
        let link = Link::entry("5KsDBWseXY6QegucYAoacS");
        assert_eq!(
            link.to_value(),
            json!({"sys": {"type": "Link", "linkType": "Entry", "id": "5KsDBWseXY6QegucYAoacS"}})
        );
        assert_eq!(serde_json::to_value(&link).unwrap(), link.to_value());
    }

    #[test]
    fn test_entry_fields_json() {
        let mut entry = DestinationEntry::new("venue");
        entry
            .fields
            .entry("title".to_string())
            .or_default()
            .insert("en".to_string(), json!("Hall"));
        entry.fields.entry("body".to_string()).or_default();

        assert_eq!(entry.get("title", "en"), Some(&json!("Hall")));
        assert_eq!(entry.get("title", "fr"), None);
        assert_eq!(entry.fields_json(), json!({"title": {"en": "Hall"}, "body": {}}));
    }
}
