//! Turns extracted text into [`Chunk`]s ready for embedding.
//!
//! Two chunkers share one [`Chunker`] trait: [`TextChunker`] does recursive
//! character splitting for prose, [`CodeChunker`] prefers AST segments (one
//! chunk per function/class, re-split when oversized) and falls back to a
//! language-aware recursive splitter when no segments are available.
//! [`ChunkRouter`] picks between them from extractor metadata, the way
//! extraction and chunking were always meant to hand off to each other.

mod ast_analyzer;
mod chunk;
mod code_chunker;
mod config;
mod error;
mod language;
mod router;
mod segment;
mod splitter;
mod text_chunker;
mod types;

pub use ast_analyzer::AstAnalyzer;
pub use chunk::{chunk_id, Chunk, Chunker};
pub use code_chunker::CodeChunker;
pub use config::{ChunkerConfig, ChunkingStrategy, OverlapStrategy};
pub use error::{ChunkerError, Result};
pub use language::Language;
pub use router::ChunkRouter;
pub use segment::Segment;
pub use splitter::recursive_split;
pub use text_chunker::TextChunker;
pub use types::{ChunkMetadata, ChunkType, CodeChunk};
