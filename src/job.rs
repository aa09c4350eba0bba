//! Migration job orchestration
//!
//! One run migrates one content model:
//! 1. Query every locale (throttled), in configured order
//! 2. Merge by slug, seeding the keyspace from the first locale
//! 3. Apply field renames
//! 4. For each record (throttled): build the entry, then create, save and
//!    publish it
//!
//! Nothing is rolled back. Under [`FailurePolicy::Abort`] the first failing
//! record stops the run and entries published before it stay published.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::backend::{EntryLookup, EntryWriter, MarkdownConverter, SourceQuery};
use crate::config::TransformSpec;
use crate::error::Result;
use crate::model::{DestinationEntry, LocaleFields};
use crate::pipeline::{
    coverage_gaps, merge_locales, remap_fields, unmatched_count, EntryBuilder, FieldClassifier,
    LocaleResult, ReferenceResolver,
};
use crate::throttle::Throttle;

/// What to do when a record fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the run at the first failing record
    #[default]
    Abort,
    /// Record the failure and move on to the next record
    Continue,
}

/// Per-run settings.
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Content model name, also the destination content type id
    pub content_model: String,
    /// Locales to query; the first one decides which records are migrated
    pub locales: Vec<String>,
    /// GraphQL selection of the model's fields
    pub query_fields: String,
    pub throttle: Throttle,
    /// Build entries without writing them
    pub dry_run: bool,
    pub failure_policy: FailurePolicy,
}

impl JobOptions {
    pub fn new(
        content_model: impl Into<String>,
        locales: Vec<String>,
        query_fields: impl Into<String>,
    ) -> Self {
        Self {
            content_model: content_model.into(),
            locales,
            query_fields: query_fields.into(),
            throttle: Throttle::random(),
            dry_run: false,
            failure_policy: FailurePolicy::Abort,
        }
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// An entry written to the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedEntry {
    pub slug: String,
    pub id: String,
    pub version: u64,
}

/// A record that could not be migrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub slug: String,
    pub error: String,
}

/// Summary of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub content_model: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Records returned per locale
    pub queried: IndexMap<String, usize>,
    /// Records after merging
    pub merged: usize,
    /// Queried records dropped because their slug is not in the first locale
    pub unmatched: usize,
    /// Record/locale pairs with no data
    pub coverage_gaps: usize,
    /// Entries built (including dry runs)
    pub built: usize,
    pub published: Vec<PublishedEntry>,
    pub failed: Vec<FailedRecord>,
    /// Stopped early on a failure
    pub aborted: bool,
    pub dry_run: bool,
}

impl MigrationReport {
    fn new(content_model: &str, dry_run: bool) -> Self {
        Self {
            content_model: content_model.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            queried: IndexMap::new(),
            merged: 0,
            unmatched: 0,
            coverage_gaps: 0,
            built: 0,
            published: Vec::new(),
            failed: Vec::new(),
            aborted: false,
            dry_run,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.aborted
    }
}

/// Migrates one content model from the source to the destination.
pub struct MigrationJob {
    options: JobOptions,
    remap: IndexMap<String, String>,
    source: Arc<dyn SourceQuery>,
    writer: Arc<dyn EntryWriter>,
    builder: EntryBuilder,
}

impl MigrationJob {
    /// Set up a job; fails if the transform spec lists a field in more than
    /// one special set.
    pub fn new(
        options: JobOptions,
        transforms: &TransformSpec,
        source: Arc<dyn SourceQuery>,
        converter: Arc<dyn MarkdownConverter>,
        lookup: Arc<dyn EntryLookup>,
        writer: Arc<dyn EntryWriter>,
    ) -> Result<Self> {
        let classifier = FieldClassifier::from_spec(transforms)?;
        debug!(special_fields = classifier.special_count(), "Compiled field classifier");

        let builder = EntryBuilder::new(
            options.content_model.clone(),
            classifier,
            converter,
            ReferenceResolver::new(lookup),
        );

        Ok(Self {
            options,
            remap: transforms.remap_fields.clone(),
            source,
            writer,
            builder,
        })
    }

    /// Run the migration.
    ///
    /// Query and merge failures are returned as errors. Record failures are
    /// reported in [`MigrationReport::failed`], with `aborted` set when the
    /// policy stopped the run.
    pub async fn run(&self) -> Result<MigrationReport> {
        let model = &self.options.content_model;
        let mut report = MigrationReport::new(model, self.options.dry_run);
        info!(model = %model, started_at = %report.started_at, "Migration started");

        let results = self.query_locales(&mut report).await?;

        let merged = merge_locales(&results)?;
        report.merged = merged.len();
        report.unmatched = unmatched_count(&results, &merged);
        report.coverage_gaps = coverage_gaps(&merged, &self.options.locales).len();
        info!(
            records = report.merged,
            unmatched = report.unmatched,
            coverage_gaps = report.coverage_gaps,
            "Merged locales"
        );

        let remapped = remap_fields(&merged, &self.remap);

        for (slug, locales) in &remapped {
            self.options.throttle.wait().await;
            info!(slug = %slug, "Processing record");

            match self.migrate_record(slug, locales, &mut report).await {
                Ok(Some(published)) => report.published.push(published),
                Ok(None) => {}
                Err(e) => {
                    error!(slug = %slug, error = %e, "Record failed");
                    report.failed.push(FailedRecord {
                        slug: slug.clone(),
                        error: e.to_string(),
                    });
                    if self.options.failure_policy == FailurePolicy::Abort {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        let finished_at = Utc::now();
        report.finished_at = Some(finished_at);
        if report.aborted {
            warn!(
                model = %model,
                published = report.published.len(),
                "Migration aborted, entries published so far remain published"
            );
        }
        info!(
            model = %model,
            finished_at = %finished_at,
            published = report.published.len(),
            failed = report.failed.len(),
            "Migration ended"
        );

        Ok(report)
    }

    async fn query_locales(&self, report: &mut MigrationReport) -> Result<Vec<LocaleResult>> {
        let mut results = Vec::with_capacity(self.options.locales.len());
        for locale in &self.options.locales {
            self.options.throttle.wait().await;
            let records = self
                .source
                .query_locale(
                    &self.options.content_model,
                    locale,
                    &self.options.query_fields,
                )
                .await?;
            info!(locale = %locale, records = records.len(), "Queried locale");
            report.queried.insert(locale.clone(), records.len());
            results.push(LocaleResult::new(locale.clone(), records));
        }
        Ok(results)
    }

    async fn migrate_record(
        &self,
        slug: &str,
        locales: &LocaleFields,
        report: &mut MigrationReport,
    ) -> Result<Option<PublishedEntry>> {
        let entry = self.builder.build(slug, locales).await?;
        report.built += 1;
        debug!(slug, entry = %entry.fields_json(), "Built entry");

        if self.options.dry_run {
            info!(slug, entry = %entry_json(&entry), "Dry run, not writing entry");
            return Ok(None);
        }

        let created = self.writer.create(&entry).await?;
        let saved = self.writer.save(&created, &entry).await?;
        let published = self.writer.publish(&saved).await?;
        info!(slug, id = %published.id, "Published entry");

        Ok(Some(PublishedEntry {
            slug: slug.to_string(),
            id: published.id,
            version: published.version,
        }))
    }
}

fn entry_json(entry: &DestinationEntry) -> String {
    serde_json::to_string(entry).unwrap_or_else(|e| format!("<unserializable entry: {}>", e))
}
