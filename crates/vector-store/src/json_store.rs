//! The `VectorStore` trait and its JSON-backed implementation: a linear
//! cosine-similarity scan over entries persisted as a single JSON file,
//! grounded in the teacher's schema-versioned persistence format but
//! without the teacher's HNSW graph index — this system's expected corpus
//! size doesn't justify an approximate-nearest-neighbor structure, and the
//! spec's non-goals rule out ranking-quality research at that scale.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use context_protocol::Value;

use crate::error::{Result, VectorStoreError};
use crate::types::{Filter, IndexedEntry};

const SCHEMA_VERSION: u32 = 1;

/// Persistence + kNN query surface over indexed chunks. One implementation,
/// [`JsonVectorStore`], is provided; the trait exists so callers (the
/// indexer, tests) don't depend on its on-disk format.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, entries: Vec<IndexedEntry>) -> Result<()>;
    async fn delete_by_id(&self, ids: &[String]) -> Result<()>;
    async fn delete_by_filter(&self, filter: &Filter) -> Result<usize>;
    async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<(IndexedEntry, f32)>>;
    async fn enumerate_payloads(&self) -> Result<Vec<BTreeMap<String, Value>>>;
    async fn clear(&self) -> Result<()>;
    async fn save(&self) -> Result<()>;
    async fn len(&self) -> usize;
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Persisted {
    schema_version: u32,
    entries: Vec<PersistedEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedEntry {
    chunk_id: String,
    vector: Vec<f32>,
    metadata: BTreeMap<String, Value>,
    page_content: String,
}

impl From<&IndexedEntry> for PersistedEntry {
    fn from(e: &IndexedEntry) -> Self {
        Self {
            chunk_id: e.chunk_id.clone(),
            vector: e.vector.clone(),
            metadata: e.metadata.clone(),
            page_content: e.page_content.clone(),
        }
    }
}

impl From<PersistedEntry> for IndexedEntry {
    fn from(e: PersistedEntry) -> Self {
        Self {
            chunk_id: e.chunk_id,
            vector: e.vector,
            metadata: e.metadata,
            page_content: e.page_content,
        }
    }
}

/// A `JsonVectorStore` holds all entries in memory, keyed by chunk id, and
/// rewrites the whole file on `save()`. Good for the single-tenant,
/// tens-of-thousands-of-chunks corpora this system targets; a store
/// backing a larger corpus would swap this adapter, not the trait.
pub struct JsonVectorStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, IndexedEntry>>,
}

impl JsonVectorStore {
    /// Loads an existing store from `path`, or starts empty if the file
    /// doesn't exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let persisted: Persisted = serde_json::from_str(&raw)?;
            persisted
                .entries
                .into_iter()
                .map(|e| (e.chunk_id.clone(), IndexedEntry::from(e)))
                .collect()
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn read_lock(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, IndexedEntry>>> {
        self.entries
            .read()
            .map_err(|_| VectorStoreError::IndexError("store lock poisoned".to_string()))
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, IndexedEntry>>> {
        self.entries
            .write()
            .map_err(|_| VectorStoreError::IndexError("store lock poisoned".to_string()))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for JsonVectorStore {
    async fn upsert(&self, new_entries: Vec<IndexedEntry>) -> Result<()> {
        let mut entries = self.write_lock()?;
        for entry in new_entries {
            entries.insert(entry.chunk_id.clone(), entry);
        }
        Ok(())
    }

    async fn delete_by_id(&self, ids: &[String]) -> Result<()> {
        let mut entries = self.write_lock()?;
        for id in ids {
            entries.remove(id);
        }
        Ok(())
    }

    async fn delete_by_filter(&self, filter: &Filter) -> Result<usize> {
        let mut entries = self.write_lock()?;
        let to_remove: Vec<String> = entries
            .iter()
            .filter(|(_, e)| filter.matches(&e.metadata))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &to_remove {
            entries.remove(id);
        }
        Ok(to_remove.len())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<(IndexedEntry, f32)>> {
        let entries = self.read_lock()?;
        let mut scored: Vec<(IndexedEntry, f32)> = entries
            .values()
            .filter(|e| filter.map(|f| f.is_empty() || f.matches(&e.metadata)).unwrap_or(true))
            .map(|e| {
                let sim = (cosine_similarity(query_vector, &e.vector) + 1.0) / 2.0;
                (e.clone(), sim)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn enumerate_payloads(&self) -> Result<Vec<BTreeMap<String, Value>>> {
        let entries = self.read_lock()?;
        Ok(entries.values().map(|e| e.metadata.clone()).collect())
    }

    async fn clear(&self) -> Result<()> {
        self.write_lock()?.clear();
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        let entries = self.read_lock()?;
        let persisted = Persisted {
            schema_version: SCHEMA_VERSION,
            entries: entries.values().map(PersistedEntry::from).collect(),
        };
        let raw = serde_json::to_string_pretty(&persisted)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = tmp_path_for(&self.path);
        std::fs::write(&tmp_path, raw)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    async fn len(&self) -> usize {
        self.read_lock().map(|e| e.len()).unwrap_or(0)
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let file_name = path
        .file_name()
        .map(|n| format!("{}.tmp", n.to_string_lossy()))
        .unwrap_or_else(|| "store.json.tmp".to_string());
    tmp.set_file_name(file_name);
    tmp
}
