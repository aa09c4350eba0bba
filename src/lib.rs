//! hygraph-migrate: one-shot content model migration from Hygraph to Contentful
//!
//! Queries every entry of one content model per locale, regroups the results
//! by slug, renames fields, converts markdown to richtext, resolves slug
//! references into entry links, reshapes locations, and creates, saves and
//! publishes one Contentful entry per record.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────────────────────────────────┐
//! │ SourceQuery  │──►│ pipeline: merge → remap → transform        │
//! │ (Hygraph)    │   │            │                               │
//! └──────────────┘   │            ├─► MarkdownConverter           │
//!                    │            └─► ReferenceResolver           │
//!                    └──────────────────┬─────────────────────────┘
//!                                       ▼
//!                              ┌──────────────────┐
//!                              │ EntryWriter      │
//!                              │ (Contentful)     │
//!                              └──────────────────┘
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod job;
pub mod model;
pub mod pipeline;
pub mod throttle;

pub use config::{Config, ConfigError, TransformSpec};
pub use error::{MigrateError, Result};
pub use job::{FailurePolicy, JobOptions, MigrationJob, MigrationReport};
pub use model::{DestinationEntry, FieldKind, Link, MergedRecords};
pub use throttle::Throttle;
