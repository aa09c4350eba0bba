//! Field-kind classification, compiled once from a transform spec.

use std::collections::HashMap;

use crate::config::{ConfigError, TransformSpec};
use crate::model::FieldKind;

/// Maps field names to the transform applied to them.
///
/// Names absent from every special set are [`FieldKind::Plain`].
#[derive(Debug, Clone, Default)]
pub struct FieldClassifier {
    kinds: HashMap<String, FieldKind>,
}

impl FieldClassifier {
    /// Build from a transform spec, rejecting names listed in more than one
    /// special set.
    pub fn from_spec(spec: &TransformSpec) -> Result<Self, ConfigError> {
        let mut classifier = Self::default();
        let sets = [
            (FieldKind::Markdown, &spec.markdown_fields),
            (FieldKind::Reference, &spec.reference_fields),
            (FieldKind::Location, &spec.location_fields),
        ];

        for (kind, fields) in sets {
            for field in fields {
                if let Some(existing) = classifier.kinds.get(field) {
                    if *existing == kind {
                        continue;
                    }
                    return Err(ConfigError::OverlappingFieldSets {
                        field: field.clone(),
                        first: existing.as_str(),
                        second: kind.as_str(),
                    });
                }
                classifier.kinds.insert(field.clone(), kind);
            }
        }

        Ok(classifier)
    }

    pub fn kind_of(&self, field: &str) -> FieldKind {
        self.kinds.get(field).copied().unwrap_or(FieldKind::Plain)
    }

    /// Number of fields with a special kind.
    pub fn special_count(&self) -> usize {
        self.kinds.len()
    }
}
