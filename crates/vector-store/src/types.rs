use std::collections::BTreeMap;

use context_protocol::Value;

/// One `(id, vector, payload)` tuple as the store sees it (spec.md §3's
/// "Indexed entry"). `page_content` is the chunk's raw text, carried
/// alongside the vector so search results don't need a second lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntry {
    pub chunk_id: String,
    pub vector: Vec<f32>,
    pub metadata: BTreeMap<String, Value>,
    pub page_content: String,
}

/// An equality filter over primitive metadata fields. All clauses must
/// match (AND semantics) — sufficient for the filters this system issues
/// (`doc_id`, `language`, `path`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: BTreeMap<String, Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, metadata: &BTreeMap<String, Value>) -> bool {
        self.clauses
            .iter()
            .all(|(k, v)| metadata.get(k) == Some(v))
    }
}
