//! Owns the per-document upsert protocol (spec.md §4.3): extract, chunk,
//! embed, then delete-then-upsert so a shorter re-indexed document never
//! leaves orphaned chunks from a longer prior version.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use context_code_chunker::ChunkRouter;
use context_extract::ExtractionRouter;
use context_protocol::Value;
use context_vector_store::{EmbeddingProvider, Filter, IndexedEntry, VectorStore};

use crate::error::{IndexerError, Result};
use crate::fingerprint::{doc_id, modified_at_iso};

/// Outcome of indexing one file, mirroring spec.md §4.3's `Success`/`Failure`.
#[derive(Debug, Clone)]
pub enum IndexOutcome {
    Success { doc_id: String, chunk_count: usize },
    Failure { doc_id: String, error: String },
}

pub struct SemanticIndexer {
    extraction_router: Arc<ExtractionRouter>,
    chunk_router: Arc<ChunkRouter>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    max_file_size: u64,
}

impl SemanticIndexer {
    pub fn new(
        extraction_router: Arc<ExtractionRouter>,
        chunk_router: Arc<ChunkRouter>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        max_file_size: u64,
    ) -> Self {
        Self {
            extraction_router,
            chunk_router,
            embedder,
            store,
            max_file_size,
        }
    }

    /// `index_file` from spec.md §4.3's pseudocode: never returns `Err` for
    /// per-document problems (extraction/chunking failures), only for
    /// infrastructure failures (store I/O) that should abort the caller's
    /// batch.
    pub async fn index_file(&self, path: &Path) -> Result<IndexOutcome> {
        let id = doc_id(path);

        let extraction = match self.extraction_router.extract(path, self.max_file_size) {
            Ok(e) => e,
            Err(e) => {
                return Ok(IndexOutcome::Failure {
                    doc_id: id,
                    error: e.to_string(),
                })
            }
        };

        let mut metadata = extraction.metadata;
        metadata.insert("doc_id".to_string(), Value::from(id.clone()));
        if let Ok(modified_at) = modified_at_iso(path) {
            metadata.insert("modified_at".to_string(), Value::from(modified_at));
        }

        let chunks = self
            .chunk_router
            .chunk(&extraction.text, &id, &metadata, extraction.segments.as_deref());

        if chunks.is_empty() {
            return Ok(IndexOutcome::Success {
                doc_id: id,
                chunk_count: 0,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(IndexerError::Other(format!(
                "embedding provider returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let entries: Vec<IndexedEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedEntry {
                chunk_id: chunk.id,
                vector,
                metadata: chunk.metadata,
                page_content: chunk.content,
            })
            .collect();
        let chunk_count = entries.len();

        // delete-then-upsert: never split across the doc's own chunks.
        self.store.delete_by_filter(&Filter::new().eq("doc_id", id.clone())).await?;
        self.store.upsert(entries).await?;

        Ok(IndexOutcome::Success {
            doc_id: id,
            chunk_count,
        })
    }

    pub async fn index_files(&self, paths: &[PathBuf]) -> Vec<Result<IndexOutcome>> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            results.push(self.index_file(path).await);
        }
        results
    }

    pub async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<(IndexedEntry, f32)>> {
        let vector = self.embedder.embed(&[query.to_string()]).await?;
        let query_vector = vector.into_iter().next().unwrap_or_default();
        Ok(self.store.search(&query_vector, k, filter).await?)
    }

    pub async fn search_by_language(
        &self,
        query: &str,
        language: &str,
        k: usize,
    ) -> Result<Vec<(IndexedEntry, f32)>> {
        self.search(query, k, Some(&Filter::new().eq("language", language))).await
    }

    pub async fn search_by_file(&self, query: &str, path: &Path, k: usize) -> Result<Vec<(IndexedEntry, f32)>> {
        let id = doc_id(path);
        self.search(query, k, Some(&Filter::new().eq("doc_id", id))).await
    }

    /// Concatenates top-k chunks with per-section headers, spec.md §4.3's
    /// `build_context` format.
    pub async fn build_context(
        &self,
        query: &str,
        k: usize,
        max_chars: Option<usize>,
        filter: Option<&Filter>,
    ) -> Result<String> {
        let hits = self.search(query, k, filter).await?;
        let mut sections = Vec::with_capacity(hits.len());
        for (entry, _score) in hits {
            let filename = entry
                .metadata
                .get("filename")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let language = entry.metadata.get("language").and_then(|v| v.as_str()).unwrap_or("text");
            let chunk_type = entry
                .metadata
                .get("chunk_type")
                .and_then(|v| v.as_str())
                .unwrap_or("text");
            sections.push(format!(
                "# {filename} [{language}] ({chunk_type})\n\n{}",
                entry.page_content
            ));
        }

        let mut context = sections.join("\n\n---\n\n");
        if let Some(max_chars) = max_chars {
            if context.chars().count() > max_chars {
                context = context.chars().take(max_chars).collect();
            }
        }
        Ok(context)
    }

    pub async fn delete_file(&self, path: &Path) -> Result<()> {
        let id = doc_id(path);
        self.store.delete_by_filter(&Filter::new().eq("doc_id", id)).await?;
        Ok(())
    }

    pub async fn clear_index(&self) -> Result<()> {
        self.store.clear().await?;
        Ok(())
    }

    /// Persists the store's in-memory state to disk (spec.md §4.4/§5's
    /// crash-safety contract). Callers that mutate the store across a batch
    /// or a watcher flush must call this afterward — mutation methods above
    /// only update the in-memory copy.
    pub async fn save(&self) -> Result<()> {
        self.store.save().await?;
        Ok(())
    }
}
