//! Field transformation into destination entries.
//!
//! Every field of every locale goes through exactly one of four strategies,
//! chosen by the [`FieldClassifier`]:
//!
//! | kind      | source value                    | destination value        |
//! |-----------|---------------------------------|--------------------------|
//! | markdown  | `{"markdown": "..."}`           | richtext document        |
//! | reference | `{"slug": ..}` or a list of them | entry link(s)           |
//! | location  | `{"latitude": a, "longitude": b}` | `{"lat": a, "lon": b}` |
//! | plain     | anything                        | unchanged                |

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use super::classify::FieldClassifier;
use super::resolve::ReferenceResolver;
use crate::backend::MarkdownConverter;
use crate::error::{shape_of, MigrateError, Result};
use crate::model::{DestinationEntry, FieldKind, LocaleFields};

/// Builds one destination entry per merged record.
pub struct EntryBuilder {
    content_type_id: String,
    classifier: FieldClassifier,
    converter: Arc<dyn MarkdownConverter>,
    resolver: ReferenceResolver,
}

impl EntryBuilder {
    pub fn new(
        content_type_id: impl Into<String>,
        classifier: FieldClassifier,
        converter: Arc<dyn MarkdownConverter>,
        resolver: ReferenceResolver,
    ) -> Self {
        Self {
            content_type_id: content_type_id.into(),
            classifier,
            converter,
            resolver,
        }
    }

    /// Transform all locales of one record.
    ///
    /// A field gets a slot as soon as any locale has it, even when no locale
    /// ends up with a value (empty markdown).
    pub async fn build(&self, slug: &str, locales: &LocaleFields) -> Result<DestinationEntry> {
        let mut entry = DestinationEntry::new(self.content_type_id.clone());

        for (locale, fields) in locales {
            for (field, value) in fields {
                let kind = self.classifier.kind_of(field);
                debug!(slug, field = %field, locale = %locale, %kind, "Processing field");

                let slot = entry.fields.entry(field.clone()).or_default();
                if let Some(transformed) = self.transform_field(kind, field, locale, value).await? {
                    slot.insert(locale.clone(), transformed);
                }
            }
        }

        Ok(entry)
    }

    async fn transform_field(
        &self,
        kind: FieldKind,
        field: &str,
        locale: &str,
        value: &Value,
    ) -> Result<Option<Value>> {
        match kind {
            FieldKind::Markdown => match markdown_text(field, locale, value)? {
                Some(markdown) => {
                    debug!(field, locale, %markdown, "Converting markdown");
                    Ok(Some(self.converter.convert(markdown).await?))
                }
                None => Ok(None),
            },
            FieldKind::Reference => Ok(Some(self.resolver.resolve(field, locale, value).await?)),
            FieldKind::Location => Ok(Some(reshape_location(field, locale, value)?)),
            FieldKind::Plain => Ok(Some(value.clone())),
        }
    }
}

/// Markdown text of a richtext source value, or `None` when there is no
/// content to convert.
pub fn markdown_text<'a>(field: &str, locale: &str, value: &'a Value) -> Result<Option<&'a str>> {
    let unexpected = || MigrateError::UnexpectedShape {
        field: field.to_string(),
        locale: locale.to_string(),
        expected: "{markdown}",
        actual: shape_of(value),
    };

    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::Object(obj) if obj.is_empty() => Ok(None),
        Value::Object(obj) => match obj.get("markdown") {
            Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            _ => Err(unexpected()),
        },
        _ => Err(unexpected()),
    }
}

/// `{latitude, longitude}` to `{lat, lon}`; other keys are dropped.
pub fn reshape_location(field: &str, locale: &str, value: &Value) -> Result<Value> {
    match (value.get("latitude"), value.get("longitude")) {
        (Some(lat), Some(lon)) => Ok(json!({ "lat": lat, "lon": lon })),
        _ => Err(MigrateError::UnexpectedShape {
            field: field.to_string(),
            locale: locale.to_string(),
            expected: "{latitude, longitude}",
            actual: shape_of(value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockConverter, MockDestination};
    use crate::config::TransformSpec;
    use crate::model::Fields;
    use proptest::prelude::*;

    fn builder(destination: MockDestination) -> (Arc<MockConverter>, EntryBuilder) {
        let spec = TransformSpec {
            markdown_fields: vec!["body".to_string()],
            reference_fields: vec!["author".to_string(), "tags".to_string()],
            location_fields: vec!["position".to_string()],
            ..Default::default()
        };
        let converter = Arc::new(MockConverter::new());
        let builder = EntryBuilder::new(
            "venue",
            FieldClassifier::from_spec(&spec).unwrap(),
            converter.clone(),
            ReferenceResolver::new(Arc::new(destination)),
        );
        (converter, builder)
    }

    fn locales(pairs: Vec<(&str, Value)>) -> LocaleFields {
        pairs
            .into_iter()
            .map(|(locale, fields)| {
                let fields: Fields = fields.as_object().cloned().unwrap();
                (locale.to_string(), fields)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_build_dispatches_each_kind() {
        let destination = MockDestination::new()
            .with_entry("author", "jane", "id-jane")
            .with_entry("tags", "music", "id-music")
            .with_entry("tags", "food", "id-food");
        let (converter, builder) = builder(destination);

        let record = locales(vec![(
            "en",
            json!({
                "slug": "hall",
                "title": "Hall",
                "body": {"markdown": "# Hall"},
                "author": {"slug": "jane"},
                "tags": [{"slug": "food"}, {"slug": "music"}],
                "position": {"latitude": 51.5, "longitude": -0.12}
            }),
        )]);

        let entry = builder.build("hall", &record).await.unwrap();
        assert_eq!(entry.content_type_id, "venue");
        assert_eq!(entry.get("slug", "en"), Some(&json!("hall")));
        assert_eq!(entry.get("title", "en"), Some(&json!("Hall")));
        assert_eq!(entry.get("body", "en"), Some(&MockConverter::document_for("# Hall")));
        assert_eq!(entry.get("author", "en").unwrap()["sys"]["id"], "id-jane");
        let tag_ids: Vec<&Value> = entry
            .get("tags", "en")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|t| &t["sys"]["id"])
            .collect();
        assert_eq!(tag_ids, vec![&json!("id-food"), &json!("id-music")]);
        assert_eq!(entry.get("position", "en"), Some(&json!({"lat": 51.5, "lon": -0.12})));
        assert_eq!(converter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_locales_accumulate_under_one_field() {
        let (_, builder) = builder(MockDestination::new());
        let record = locales(vec![
            ("en", json!({"title": "Hall"})),
            ("fr", json!({"title": "Salle"})),
        ]);

        let entry = builder.build("hall", &record).await.unwrap();
        assert_eq!(entry.fields.len(), 1);
        assert_eq!(entry.fields_json(), json!({"title": {"en": "Hall", "fr": "Salle"}}));
    }

    #[tokio::test]
    async fn test_empty_markdown_leaves_locale_unset() {
        let (converter, builder) = builder(MockDestination::new());
        let record = locales(vec![
            ("en", json!({"body": {"markdown": "Hello"}})),
            ("fr", json!({"body": null})),
            ("de", json!({"body": {"markdown": ""}})),
        ]);

        let entry = builder.build("hall", &record).await.unwrap();
        let body = &entry.fields["body"];
        assert_eq!(body.len(), 1);
        assert!(body.contains_key("en"));
        assert_eq!(converter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_markdown_slot_exists_without_content() {
        let (_, builder) = builder(MockDestination::new());
        let record = locales(vec![("en", json!({"body": null}))]);
        let entry = builder.build("hall", &record).await.unwrap();
        assert_eq!(entry.fields_json(), json!({"body": {}}));
    }

    #[tokio::test]
    async fn test_dispatch_ignores_value_shape() {
        let (converter, builder) = builder(MockDestination::new());
        // Looks like a location and a markdown value, but both fields are plain.
        let record = locales(vec![(
            "en",
            json!({
                "where": {"latitude": 1.0, "longitude": 2.0},
                "notes": {"markdown": "*hi*"}
            }),
        )]);

        let entry = builder.build("hall", &record).await.unwrap();
        assert_eq!(entry.get("where", "en"), Some(&json!({"latitude": 1.0, "longitude": 2.0})));
        assert_eq!(entry.get("notes", "en"), Some(&json!({"markdown": "*hi*"})));
        assert_eq!(converter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_reference_fails_record() {
        let (_, builder) = builder(MockDestination::new());
        let record = locales(vec![("en", json!({"author": {"slug": "ghost"}}))]);
        let result = builder.build("hall", &record).await;
        assert!(matches!(result, Err(MigrateError::ReferenceNotFound { .. })));
    }

    #[test]
    fn test_reshape_location_exact_keys() {
        let value = json!({"latitude": 48.85, "longitude": 2.35, "altitude": 35});
        assert_eq!(
            reshape_location("position", "en", &value).unwrap(),
            json!({"lat": 48.85, "lon": 2.35})
        );
    }

    #[test]
    fn test_reshape_location_rejects_bad_shape() {
        for value in [json!(null), json!({"latitude": 1.0}), json!([1.0, 2.0])] {
            assert!(matches!(
                reshape_location("position", "en", &value),
                Err(MigrateError::UnexpectedShape { .. })
            ));
        }
    }

    #[test]
    fn test_markdown_text_shapes() {
        assert_eq!(markdown_text("b", "en", &json!({"markdown": "x"})).unwrap(), Some("x"));
        assert_eq!(markdown_text("b", "en", &json!(null)).unwrap(), None);
        assert_eq!(markdown_text("b", "en", &json!({})).unwrap(), None);
        assert_eq!(markdown_text("b", "en", &json!({"markdown": null})).unwrap(), None);
        // Empty text is not sent to the converter.
        assert_eq!(markdown_text("b", "en", &json!({"markdown": ""})).unwrap(), None);
        assert_eq!(markdown_text("b", "en", &json!("")).unwrap(), None);
        assert!(markdown_text("b", "en", &json!({"html": "<p/>"})).is_err());
        assert!(markdown_text("b", "en", &json!(42)).is_err());
    }

    proptest! {
        #[test]
        fn prop_reshape_location_keeps_only_lat_lon(
            lat in -90.0f64..90.0,
            lon in -180.0f64..180.0,
            extra in proptest::collection::btree_map("[a-z]{1,8}", 0i64..1000, 0..4),
        ) {
            let mut value = json!({"latitude": lat, "longitude": lon});
            for (key, v) in &extra {
                if key != "latitude" && key != "longitude" {
                    value[key.as_str()] = json!(v);
                }
            }

            let reshaped = reshape_location("position", "en", &value).unwrap();
            prop_assert_eq!(reshaped, json!({"lat": lat, "lon": lon}));
        }

        #[test]
        fn prop_reshape_location_requires_both_keys(
            lat in -90.0f64..90.0,
            drop_latitude in any::<bool>(),
        ) {
            let value = if drop_latitude {
                json!({"longitude": lat})
            } else {
                json!({"latitude": lat})
            };
            prop_assert!(
                matches!(
                    reshape_location("position", "en", &value),
                    Err(MigrateError::UnexpectedShape { .. })
                ),
                "expected UnexpectedShape"
            );
        }
    }
}
