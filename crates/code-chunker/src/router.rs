use std::collections::BTreeMap;

use context_protocol::{ChunkingConfig, Value};

use crate::chunk::Chunk;
use crate::code_chunker::CodeChunker;
use crate::segment::Segment;
use crate::text_chunker::TextChunker;

/// Picks `CodeChunker` (with or without segments) or `TextChunker` based on
/// what the extractor's metadata says about the content, mirroring the
/// extraction-then-chunking hand-off: segments present and AST chunking
/// enabled -> code with segments; a language tag or a code extractor with no
/// segments -> code without segments; otherwise plain text.
pub struct ChunkRouter {
    text_chunker: TextChunker,
    code_chunker: CodeChunker,
    use_ast_chunks: bool,
}

impl ChunkRouter {
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self {
            text_chunker: TextChunker::from_config(config),
            code_chunker: CodeChunker::from_config(config),
            use_ast_chunks: config.use_ast_chunks,
        }
    }

    pub fn chunk(
        &self,
        text: &str,
        doc_id: &str,
        metadata: &BTreeMap<String, Value>,
        segments: Option<&[Segment]>,
    ) -> Vec<Chunk> {
        let language = metadata.get("language").and_then(|v| v.as_str());
        let extractor = metadata.get("extractor").and_then(|v| v.as_str());

        if self.use_ast_chunks {
            if let Some(segments) = segments {
                if !segments.is_empty() {
                    return self.code_chunker.chunk_with_segments(text, doc_id, segments, metadata);
                }
            }
        }

        if language.is_some() || extractor == Some("code") {
            return self.code_chunker.chunk(text, doc_id, metadata);
        }

        self.text_chunker.chunk(text, doc_id, metadata)
    }
}
