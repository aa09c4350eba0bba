//! Locale merging
//!
//! Source queries are run once per locale. Merging regroups the results by
//! natural key so each record carries all of its locales:
//! `slug -> locale -> fields`.
//!
//! The keyspace is seeded from the first locale only. A slug that appears in
//! a later locale but not in the first one is dropped, so only records present
//! in the first queried locale are ever migrated.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{MigrateError, Result};
use crate::model::{Fields, MergedRecords};

/// Query results for one locale.
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleResult {
    pub locale: String,
    pub records: Vec<Value>,
}

impl LocaleResult {
    pub fn new(locale: impl Into<String>, records: Vec<Value>) -> Self {
        Self {
            locale: locale.into(),
            records,
        }
    }
}

/// Regroup per-locale results by slug.
pub fn merge_locales(results: &[LocaleResult]) -> Result<MergedRecords> {
    let mut merged = MergedRecords::new();
    let Some(first) = results.first() else {
        return Ok(merged);
    };

    seed_keyspace(&mut merged, first)?;

    for result in results {
        for record in &result.records {
            let (slug, fields) = split_record(record, &result.locale)?;
            match merged.get_mut(slug) {
                Some(locales) => {
                    locales.insert(result.locale.clone(), fields);
                }
                None => {
                    debug!(
                        slug,
                        locale = %result.locale,
                        first_locale = %first.locale,
                        "Dropping record absent from first locale"
                    );
                }
            }
        }
    }

    Ok(merged)
}

fn seed_keyspace(merged: &mut MergedRecords, first: &LocaleResult) -> Result<()> {
    for record in &first.records {
        let slug = natural_key(record, &first.locale)?;
        merged.entry(slug.to_string()).or_default();
    }
    debug!(locale = %first.locale, keys = merged.len(), "Seeded keyspace");
    Ok(())
}

fn natural_key<'a>(record: &'a Value, locale: &str) -> Result<&'a str> {
    record
        .get("slug")
        .and_then(Value::as_str)
        .ok_or_else(|| MigrateError::MissingNaturalKey {
            locale: locale.to_string(),
        })
}

fn split_record<'a>(record: &'a Value, locale: &str) -> Result<(&'a str, Fields)> {
    let slug = natural_key(record, locale)?;
    let fields = record.as_object().cloned().unwrap_or_default();
    Ok((slug, fields))
}

/// Number of queried records that did not make it into `merged`.
pub fn unmatched_count(results: &[LocaleResult], merged: &MergedRecords) -> usize {
    let queried: usize = results.iter().map(|r| r.records.len()).sum();
    let kept: usize = merged.values().map(|locales| locales.len()).sum();
    queried.saturating_sub(kept)
}

/// `(slug, locale)` pairs where a configured locale has no data for a record.
///
/// Partial locale coverage is tolerated; this only reports it.
pub fn coverage_gaps(merged: &MergedRecords, locales: &[String]) -> Vec<(String, String)> {
    let mut gaps = Vec::new();
    for (slug, present) in merged {
        for locale in locales {
            if !present.contains_key(locale) {
                gaps.push((slug.clone(), locale.clone()));
            }
        }
    }
    for (slug, locale) in &gaps {
        warn!(slug = %slug, locale = %locale, "Record has no data for locale");
    }
    gaps
}
