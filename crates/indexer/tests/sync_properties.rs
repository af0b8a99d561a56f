//! Integration coverage for the testable properties around directory
//! synchronization: idempotent re-sync, deletion propagation, and
//! cross-restart persistence of the JSON-backed store.

use std::sync::Arc;

use context_code_chunker::ChunkRouter;
use context_extract::{ExtractionRouter, TextExtractor};
use context_indexer::{DirectorySynchronizer, SemanticIndexer};
use context_protocol::ChunkingConfig;
use context_vector_store::{JsonVectorStore, StubEmbeddingProvider, VectorStore};
use tempfile::TempDir;

fn build(
    db_path: &std::path::Path,
) -> (Arc<ExtractionRouter>, Arc<dyn VectorStore>, DirectorySynchronizer) {
    let extraction_router = Arc::new(
        ExtractionRouter::new().register(TextExtractor::new(
            vec![".txt".to_string(), ".md".to_string()],
            vec![],
        )),
    );
    let chunk_router = Arc::new(ChunkRouter::from_config(&ChunkingConfig::default()));
    let store: Arc<dyn VectorStore> = Arc::new(JsonVectorStore::open(db_path).unwrap());
    let indexer = Arc::new(SemanticIndexer::new(
        extraction_router.clone(),
        chunk_router,
        Arc::new(StubEmbeddingProvider::new(8)),
        store.clone(),
        10 * 1024 * 1024,
    ));
    let sync = DirectorySynchronizer::new(extraction_router.clone(), store.clone(), indexer);
    (extraction_router, store, sync)
}

#[tokio::test]
async fn repeated_sync_over_unchanged_tree_is_idempotent() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha beta gamma delta").unwrap();
    std::fs::write(dir.path().join("b.md"), "epsilon zeta eta theta").unwrap();

    let db_path = dir.path().join("store.json");
    let (_router, store, sync) = build(&db_path);

    sync.sync(dir.path(), true, &[], &[], 8, false, None, None)
        .await
        .unwrap();
    let count_after_first = store.len().await;

    for _ in 0..3 {
        let report = sync
            .sync(dir.path(), true, &[], &[], 8, false, None, None)
            .await
            .unwrap();
        assert!(report.indexed.is_empty());
        assert!(report.deleted.is_empty());
    }

    assert_eq!(store.len().await, count_after_first);
}

#[tokio::test]
async fn edited_file_is_reindexed_without_duplicating_chunks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::write(&path, "short").unwrap();

    let db_path = dir.path().join("store.json");
    let (_router, store, sync) = build(&db_path);

    sync.sync(dir.path(), true, &[], &[], 8, false, None, None)
        .await
        .unwrap();
    let first_len = store.len().await;

    // Touch mtime forward and change content so the synchronizer sees a
    // real modification, not a no-op.
    std::thread::sleep(std::time::Duration::from_millis(20));
    std::fs::write(&path, "a much longer body of text that should chunk differently than before").unwrap();

    let report = sync
        .sync(dir.path(), true, &[], &[], 8, false, None, None)
        .await
        .unwrap();
    assert_eq!(report.indexed.len(), 1);
    assert!(report.deleted.is_empty());
    assert_ne!(store.len().await, first_len + first_len);
}

#[tokio::test]
async fn deleting_a_file_removes_its_chunks_on_next_sync() {
    let dir = TempDir::new().unwrap();
    let keep = dir.path().join("keep.txt");
    let remove = dir.path().join("remove.txt");
    std::fs::write(&keep, "kept content here").unwrap();
    std::fs::write(&remove, "removed content here").unwrap();

    let db_path = dir.path().join("store.json");
    let (_router, store, sync) = build(&db_path);

    sync.sync(dir.path(), true, &[], &[], 8, false, None, None)
        .await
        .unwrap();
    let before = store.len().await;

    std::fs::remove_file(&remove).unwrap();
    let report = sync
        .sync(dir.path(), true, &[], &[], 8, false, None, None)
        .await
        .unwrap();

    assert_eq!(report.deleted.len(), 1);
    assert!(store.len().await < before);
}

#[tokio::test]
async fn store_state_survives_reopen_across_process_boundary() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "persisted content").unwrap();

    let db_path = dir.path().join("store.json");
    {
        let (_router, store, sync) = build(&db_path);
        sync.sync(dir.path(), true, &[], &[], 8, false, None, None)
            .await
            .unwrap();
        store.save().await.unwrap();
    }

    let reopened = JsonVectorStore::open(&db_path).unwrap();
    assert!(reopened.len().await > 0);
}

#[tokio::test]
async fn cancellation_stops_processing_at_the_next_batch_boundary() {
    let dir = TempDir::new().unwrap();
    for i in 0..6 {
        std::fs::write(dir.path().join(format!("f{i}.txt")), format!("content number {i}")).unwrap();
    }

    let db_path = dir.path().join("store.json");
    let (_router, store, sync) = build(&db_path);
    let cancel = context_indexer::CancelToken::new();
    cancel.cancel();

    let report = sync
        .sync(dir.path(), true, &[], &[], 2, false, None, Some(&cancel))
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(store.len().await, 0);
}
