//! Reconciles a directory tree against the store (spec.md §4.4) — the
//! hardest component: correct under concurrent filesystem mutation and
//! across crashes, because every per-document operation (delete-all then
//! upsert) is sequenced so it never splits a document's chunks across
//! batches.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use context_extract::ExtractionRouter;
use context_vector_store::VectorStore;

use crate::error::Result;
use crate::fingerprint::{doc_id, modified_at_iso, resolve_path};
use crate::scanner::FileScanner;
use crate::semantic_indexer::{IndexOutcome, SemanticIndexer};

/// Called between batches with `(processed, total, message)`.
pub type ProgressCallback<'a> = dyn Fn(usize, usize, &str) + Send + Sync + 'a;

/// Cooperative cancellation flag checked at batch boundaries (spec.md §5).
#[derive(Debug, Default, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub indexed: Vec<String>,
    pub deleted: Vec<String>,
    pub failures: Vec<(String, String)>,
    pub cancelled: bool,
}

pub struct DirectorySynchronizer {
    extraction_router: Arc<ExtractionRouter>,
    store: Arc<dyn VectorStore>,
    indexer: Arc<SemanticIndexer>,
}

impl DirectorySynchronizer {
    pub fn new(
        extraction_router: Arc<ExtractionRouter>,
        store: Arc<dyn VectorStore>,
        indexer: Arc<SemanticIndexer>,
    ) -> Self {
        Self {
            extraction_router,
            store,
            indexer,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn sync(
        &self,
        root: &Path,
        recursive: bool,
        allowed_list: &[String],
        block_list: &[String],
        batch_size: usize,
        force_rebuild: bool,
        progress: Option<&ProgressCallback<'_>>,
        cancel: Option<&CancelToken>,
    ) -> Result<SyncReport> {
        // Step 1: enumerate filesystem.
        let scanner = FileScanner::new(root, recursive, &self.extraction_router, allowed_list, block_list);
        let current: HashMap<PathBuf, String> = scanner
            .scan()
            .into_iter()
            .map(|p| {
                let resolved = resolve_path(&p);
                let mtime = modified_at_iso(&p).unwrap_or_default();
                (resolved, mtime)
            })
            .collect();

        // Step 2: enumerate index (path -> modified_at, one entry per path).
        let payloads = self.store.enumerate_payloads().await?;
        let mut indexed: BTreeMap<String, String> = BTreeMap::new();
        for metadata in payloads {
            let Some(path) = metadata.get("path").and_then(|v| v.as_str()) else {
                continue;
            };
            let modified_at = metadata.get("modified_at").and_then(|v| v.as_str()).unwrap_or("").to_string();
            indexed.entry(path.to_string()).or_insert(modified_at);
        }

        // Step 3: classify.
        let current_by_path: BTreeMap<String, &PathBuf> = current
            .keys()
            .map(|p| (p.to_string_lossy().to_string(), p))
            .collect();

        let to_delete: Vec<String> = indexed
            .keys()
            .filter(|p| !current_by_path.contains_key(p.as_str()))
            .cloned()
            .collect();

        let mut to_process: Vec<PathBuf> = Vec::new();
        for (path_str, path) in &current_by_path {
            let fs_mtime = current.get(*path).cloned().unwrap_or_default();
            match indexed.get(path_str) {
                None => to_process.push((*path).clone()),
                Some(stored_mtime) => {
                    if force_rebuild || fs_mtime.is_empty() || *stored_mtime != fs_mtime {
                        to_process.push((*path).clone());
                    }
                }
            }
        }

        let mut report = SyncReport::default();

        // Step 4a: deletes.
        for path in &to_delete {
            let id = doc_id(Path::new(path));
            if let Err(e) = self.indexer.delete_file(Path::new(path)).await {
                report.failures.push((id, e.to_string()));
            } else {
                report.deleted.push(id);
            }
        }

        // Step 4b: batched delete-then-upsert for to_add ∪ to_update.
        let total = to_process.len();
        let mut processed = 0usize;

        for batch in to_process.chunks(batch_size.max(1)) {
            if cancel.map(|c| c.is_cancelled()).unwrap_or(false) {
                report.cancelled = true;
                self.indexer.save().await?;
                return Ok(report);
            }

            for path in batch {
                match self.indexer.index_file(path).await {
                    Ok(IndexOutcome::Success { doc_id, .. }) => report.indexed.push(doc_id),
                    Ok(IndexOutcome::Failure { doc_id, error }) => report.failures.push((doc_id, error)),
                    Err(e) => report.failures.push((doc_id(path), e.to_string())),
                }
                processed += 1;
            }

            if let Some(progress) = progress {
                progress(processed, total, "indexing");
            }
        }

        // Persist to disk at the end of every sync, not just on cancellation,
        // so a reopened store (a fresh `context search` process, a crash
        // between syncs) sees what this run indexed — spec.md §4.4/§5.
        self.indexer.save().await?;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_code_chunker::ChunkRouter;
    use context_extract::{ExtractionRouter, TextExtractor};
    use context_protocol::ChunkingConfig;
    use context_vector_store::{JsonVectorStore, StubEmbeddingProvider};
    use tempfile::TempDir;

    fn build(dir: &Path) -> (Arc<ExtractionRouter>, DirectorySynchronizer) {
        let extraction_router = Arc::new(
            ExtractionRouter::new().register(TextExtractor::new(vec![".txt".to_string()], vec![])),
        );
        let chunk_router = Arc::new(ChunkRouter::from_config(&ChunkingConfig::default()));
        let store: Arc<dyn VectorStore> = Arc::new(JsonVectorStore::open(dir.join("store.json")).unwrap());
        let indexer = Arc::new(SemanticIndexer::new(
            extraction_router.clone(),
            chunk_router,
            Arc::new(StubEmbeddingProvider::new(8)),
            store.clone(),
            10 * 1024 * 1024,
        ));
        (
            extraction_router.clone(),
            DirectorySynchronizer::new(extraction_router, store, indexer),
        )
    }

    #[tokio::test]
    async fn first_sync_adds_every_admitted_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello world").unwrap();
        std::fs::write(dir.path().join("b.txt"), "goodbye world").unwrap();

        let (_router, sync) = build(dir.path());
        let report = sync
            .sync(dir.path(), true, &[], &[], 10, false, None, None)
            .await
            .unwrap();

        assert_eq!(report.indexed.len(), 2);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn second_sync_with_no_changes_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello world").unwrap();

        let (_router, sync) = build(dir.path());
        sync.sync(dir.path(), true, &[], &[], 10, false, None, None).await.unwrap();
        let second = sync.sync(dir.path(), true, &[], &[], 10, false, None, None).await.unwrap();

        assert!(second.indexed.is_empty());
        assert!(second.deleted.is_empty());
    }

    #[tokio::test]
    async fn deleted_file_is_removed_on_next_sync() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello world").unwrap();

        let (_router, sync) = build(dir.path());
        sync.sync(dir.path(), true, &[], &[], 10, false, None, None).await.unwrap();

        std::fs::remove_file(&path).unwrap();
        let report = sync.sync(dir.path(), true, &[], &[], 10, false, None, None).await.unwrap();
        assert_eq!(report.deleted.len(), 1);
    }

    #[tokio::test]
    async fn force_rebuild_reindexes_everything() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello world").unwrap();

        let (_router, sync) = build(dir.path());
        sync.sync(dir.path(), true, &[], &[], 10, false, None, None).await.unwrap();
        let report = sync.sync(dir.path(), true, &[], &[], 10, true, None, None).await.unwrap();

        assert_eq!(report.indexed.len(), 1);
        assert!(report.deleted.is_empty());
    }
}
