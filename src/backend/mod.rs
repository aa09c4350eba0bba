//! External collaborators of a migration run.
//!
//! Trait-based seams for everything the pipeline does not own:
//! - Parameter/secret lookup (file, environment, chained)
//! - Source queries against the Hygraph content API
//! - Markdown to richtext conversion
//! - Contentful entry lookup and writes
//! - In-memory implementations for tests

pub mod contentful;
pub mod hygraph;
pub mod mock;
pub mod params;
pub mod richtext;
pub mod traits;

pub use contentful::{ContentfulClient, ContentfulConfig};
pub use hygraph::HygraphClient;
pub use mock::{MemoryParameterStore, MockConverter, MockDestination, MockSource, WriteOp};
pub use params::{ChainedParameterStore, EnvParameterStore, FileParameterStore};
pub use richtext::HttpRichTextConverter;
pub use traits::{
    ConversionError, DestinationError, EntryHandle, EntryLookup, EntryWriter, MarkdownConverter,
    ParameterError, ParameterStore, SourceError, SourceQuery,
};
