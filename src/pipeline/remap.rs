//! Field renaming for schema evolution between source and destination.

use indexmap::IndexMap;
use tracing::debug;

use crate::model::{Fields, MergedRecords};

/// Rename fields of every locale of every record, returning a new mapping.
///
/// Renames are looked up against the original field names only, so
/// `{a: b, b: c}` moves `a` to `b` and `b` to `c` without chaining. A rename
/// target that already exists as a field is overwritten.
pub fn remap_fields(records: &MergedRecords, remap: &IndexMap<String, String>) -> MergedRecords {
    if remap.is_empty() {
        return records.clone();
    }

    records
        .iter()
        .map(|(slug, locales)| {
            let renamed = locales
                .iter()
                .map(|(locale, fields)| (locale.clone(), remap_locale(fields, remap)))
                .collect();
            (slug.clone(), renamed)
        })
        .collect()
}

fn remap_locale(fields: &Fields, remap: &IndexMap<String, String>) -> Fields {
    let mut renamed = Fields::new();
    for (field, value) in fields {
        if !remap.contains_key(field) {
            renamed.insert(field.clone(), value.clone());
        }
    }
    // Renamed values go in last so they win over an existing field of the same name.
    for (field, value) in fields {
        if let Some(new_name) = remap.get(field) {
            debug!(from = %field, to = %new_name, "Remapping field");
            renamed.insert(new_name.clone(), value.clone());
        }
    }
    renamed
}
