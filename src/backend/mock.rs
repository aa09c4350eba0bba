//! In-memory backends for testing and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::traits::*;
use crate::model::DestinationEntry;

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Parameters held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryParameterStore {
    values: HashMap<String, String>,
}

impl MemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl ParameterStore for MemoryParameterStore {
    fn get(&self, name: &str) -> Result<String, ParameterError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| ParameterError::Missing(name.to_string()))
    }
}

/// Source returning canned records per locale.
#[derive(Default)]
pub struct MockSource {
    records: HashMap<String, Vec<Value>>,
    queried: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the records returned for a locale.
    pub fn with_locale(mut self, locale: impl Into<String>, records: Vec<Value>) -> Self {
        self.records.insert(locale.into(), records);
        self
    }

    /// Locales queried so far, in call order.
    pub fn queried(&self) -> Vec<String> {
        locked(&self.queried).clone()
    }
}

#[async_trait]
impl SourceQuery for MockSource {
    async fn query_locale(
        &self,
        _model: &str,
        locale: &str,
        _selection: &str,
    ) -> Result<Vec<Value>, SourceError> {
        locked(&self.queried).push(locale.to_string());
        Ok(self.records.get(locale).cloned().unwrap_or_default())
    }
}

/// Converter that wraps the markdown text in a single-paragraph document.
#[derive(Default)]
pub struct MockConverter {
    calls: AtomicU32,
}

impl MockConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document produced for a markdown text.
    pub fn document_for(markdown: &str) -> Value {
        json!({
            "nodeType": "document",
            "data": {},
            "content": [{
                "nodeType": "paragraph",
                "data": {},
                "content": [{"nodeType": "text", "value": markdown, "marks": [], "data": {}}]
            }]
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarkdownConverter for MockConverter {
    async fn convert(&self, markdown: &str) -> Result<Value, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::document_for(markdown))
    }
}

/// One write operation seen by [`MockDestination`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Create { id: String, content_type: String },
    Save { id: String, version: u64 },
    Publish { id: String, version: u64 },
}

#[derive(Default)]
struct DestinationState {
    next_id: u32,
    ops: Vec<WriteOp>,
    drafts: HashMap<String, DestinationEntry>,
    published: Vec<(String, DestinationEntry)>,
}

/// Destination with seeded lookup entries that records every write.
#[derive(Default)]
pub struct MockDestination {
    existing: HashMap<(String, String), Vec<String>>,
    lookups: AtomicU32,
    state: Mutex<DestinationState>,
}

impl MockDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing entry that reference lookups can find.
    pub fn with_entry(
        mut self,
        content_type: impl Into<String>,
        slug: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        self.existing
            .entry((content_type.into(), slug.into()))
            .or_default()
            .push(id.into());
        self
    }

    pub fn lookup_count(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Every write operation, in call order.
    pub fn ops(&self) -> Vec<WriteOp> {
        locked(&self.state).ops.clone()
    }

    /// Published entries with their assigned ids, in publish order.
    pub fn published(&self) -> Vec<(String, DestinationEntry)> {
        locked(&self.state).published.clone()
    }
}

#[async_trait]
impl EntryLookup for MockDestination {
    async fn find_entries(
        &self,
        content_type: &str,
        slug: &str,
    ) -> Result<Vec<String>, DestinationError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .existing
            .get(&(content_type.to_string(), slug.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl EntryWriter for MockDestination {
    async fn create(&self, entry: &DestinationEntry) -> Result<EntryHandle, DestinationError> {
        let mut state = locked(&self.state);
        state.next_id += 1;
        let id = format!("entry-{}", state.next_id);
        state.ops.push(WriteOp::Create {
            id: id.clone(),
            content_type: entry.content_type_id.clone(),
        });
        state.drafts.insert(id.clone(), entry.clone());
        Ok(EntryHandle { id, version: 1 })
    }

    async fn save(
        &self,
        handle: &EntryHandle,
        entry: &DestinationEntry,
    ) -> Result<EntryHandle, DestinationError> {
        let mut state = locked(&self.state);
        if !state.drafts.contains_key(&handle.id) {
            return Err(DestinationError::NotFound(handle.id.clone()));
        }
        state.ops.push(WriteOp::Save {
            id: handle.id.clone(),
            version: handle.version,
        });
        state.drafts.insert(handle.id.clone(), entry.clone());
        Ok(EntryHandle {
            id: handle.id.clone(),
            version: handle.version + 1,
        })
    }

    async fn publish(&self, handle: &EntryHandle) -> Result<EntryHandle, DestinationError> {
        let mut state = locked(&self.state);
        let entry = state
            .drafts
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| DestinationError::NotFound(handle.id.clone()))?;
        state.ops.push(WriteOp::Publish {
            id: handle.id.clone(),
            version: handle.version,
        });
        state.published.push((handle.id.clone(), entry));
        Ok(EntryHandle {
            id: handle.id.clone(),
            version: handle.version + 1,
        })
    }
}
