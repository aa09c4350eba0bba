//! Record transformation pipeline
//!
//! ```text
//! per-locale results ──► merge ──► remap ──► transform ──► DestinationEntry
//!                                              │
//!                                              ├─► MarkdownConverter
//!                                              └─► ReferenceResolver ─► EntryLookup
//! ```

pub mod classify;
pub mod merge;
pub mod remap;
pub mod resolve;
pub mod transform;

pub use classify::FieldClassifier;
pub use merge::{coverage_gaps, merge_locales, unmatched_count, LocaleResult};
pub use remap::remap_fields;
pub use resolve::ReferenceResolver;
pub use transform::{reshape_location, EntryBuilder};
