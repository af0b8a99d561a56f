//! Wires a [`Config`] into the concrete extractor/chunker/embedder/store
//! stack the library crates define traits for. This is the only place the
//! demonstration binary decides which concrete adapters to run; everything
//! downstream (`SemanticIndexer`, `DirectorySynchronizer`, `FsWatcher`,
//! `HybridPlanner`) only sees the trait objects.

use std::path::PathBuf;
use std::sync::Arc;

use context_code_chunker::ChunkRouter;
use context_extract::{CodeExtractor, DocxExtractor, ExtractionRouter, PdfExtractor, TextExtractor};
use context_indexer::{db_path_for, SemanticIndexer};
use context_protocol::Config;
use context_search::{FilenameSearch, HybridPlanner, MdfindTool};
use context_vector_store::{EmbeddingProvider, JsonVectorStore, OnnxEmbeddingProvider, StubEmbeddingProvider, VectorStore};

/// Default code file extensions the demonstration binary registers with the
/// `CodeExtractor`, on top of whatever `indexer.extraction.allowed_extensions`
/// adds. Kept separate from `text_extensions` (plain-text files with no AST).
const DEFAULT_CODE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "mjs", "cjs", "ts", "tsx", "jsx", "go", "java", "c", "h", "cpp", "hpp", "cs", "rb",
];

pub fn extraction_router(config: &Config) -> Arc<ExtractionRouter> {
    let mut code_extensions: Vec<String> = DEFAULT_CODE_EXTENSIONS.iter().map(|s| s.to_string()).collect();
    code_extensions.extend(config.indexer.extraction.allowed_extensions.iter().cloned());

    let text_extensions: Vec<String> = config
        .text_extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_string())
        .filter(|e| !code_extensions.contains(e))
        .collect();

    let router = ExtractionRouter::new()
        .register(CodeExtractor::new(code_extensions, vec!["Makefile".to_string()], vec![], config.indexer.chunking.use_ast_chunks))
        .register(PdfExtractor::default())
        .register(DocxExtractor::default())
        .register(TextExtractor::new(text_extensions, vec![]));

    Arc::new(router)
}

pub fn chunk_router(config: &Config) -> Arc<ChunkRouter> {
    Arc::new(ChunkRouter::from_config(&config.indexer.chunking))
}

/// `CONTEXT_EMBEDDING_MODE=stub` runs a deterministic hash-based embedder
/// with no model files required — useful for demonstrations and the
/// integration tests in `tests/`. Anything else loads an ONNX model from
/// `indexer.embedding.model` (a directory containing `model.onnx`,
/// `tokenizer.json`, `manifest.json`).
pub fn embedding_provider(config: &Config) -> Arc<dyn EmbeddingProvider> {
    if std::env::var("CONTEXT_EMBEDDING_MODE").as_deref() == Ok("stub") {
        return Arc::new(StubEmbeddingProvider::new(32));
    }
    Arc::new(OnnxEmbeddingProvider::new(PathBuf::from(&config.indexer.embedding.model)))
}

pub fn vector_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    let path = db_path_for(config);
    Ok(Arc::new(JsonVectorStore::open(path)?))
}

pub fn semantic_indexer(
    config: &Config,
    extraction_router: Arc<ExtractionRouter>,
    chunk_router: Arc<ChunkRouter>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
) -> Arc<SemanticIndexer> {
    Arc::new(SemanticIndexer::new(
        extraction_router,
        chunk_router,
        embedder,
        store,
        config.index.max_file_size,
    ))
}

/// Wires a `HybridPlanner` with spec.md §4.7's empty-store auto-index
/// enabled, so a `search` invocation against a never-synced root still
/// returns results once the background sync it kicks off completes.
pub fn hybrid_planner(
    config: &Config,
    indexer: Arc<SemanticIndexer>,
    extraction_router: Arc<ExtractionRouter>,
    store: Arc<dyn VectorStore>,
) -> HybridPlanner {
    let filename = FilenameSearch::new(
        Box::new(MdfindTool),
        config.root.clone(),
        config.allowed_list.clone(),
        config.block_list.clone(),
    );
    HybridPlanner::new(filename, indexer, config.hybrid_search.clone())
        .with_auto_index(config.clone(), extraction_router, store)
}
