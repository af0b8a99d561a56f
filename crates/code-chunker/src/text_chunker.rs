use std::collections::BTreeMap;

use context_protocol::{ChunkingConfig, Value};

use crate::chunk::{chunk_id, Chunk, Chunker};
use crate::splitter::recursive_split;

/// Recursive character splitting for prose: tries the coarsest separator
/// first (paragraph breaks), falling back to finer ones only where needed.
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: Vec<String>) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap, config.separators.clone())
    }
}

impl Chunker for TextChunker {
    fn chunk(&self, text: &str, doc_id: &str, metadata: &BTreeMap<String, Value>) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let pieces = recursive_split(text, self.chunk_size, self.chunk_overlap, &self.separators);
        let total = pieces.len();

        pieces
            .into_iter()
            .enumerate()
            .map(|(index, content)| {
                let mut chunk_metadata = metadata.clone();
                chunk_metadata.insert("chunker".to_string(), Value::from(self.name()));
                chunk_metadata.insert("chunk_index".to_string(), Value::from(index as i64));
                chunk_metadata.insert("total_chunks".to_string(), Value::from(total as i64));

                Chunk {
                    id: chunk_id(doc_id, index),
                    doc_id: doc_id.to_string(),
                    index,
                    content,
                    metadata: chunk_metadata,
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        "text"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_config() -> ChunkingConfig {
        ChunkingConfig::default()
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        let chunker = TextChunker::from_config(&default_config());
        let chunks = chunker.chunk("   \n  ", "doc1", &BTreeMap::new());
        assert!(chunks.is_empty());
    }

    #[test]
    fn tags_chunk_index_and_total() {
        let chunker = TextChunker::new(20, 0, vec!["\n\n".into(), " ".into(), String::new()]);
        let text = format!("{}\n\n{}", "a".repeat(15), "b".repeat(15));
        let chunks = chunker.chunk(&text, "doc1", &BTreeMap::new());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.get("chunk_index").unwrap().as_i64(), Some(0));
        assert_eq!(chunks[0].metadata.get("total_chunks").unwrap().as_i64(), Some(2));
        assert_eq!(chunks[0].id.len(), 24);
    }

    #[test]
    fn carries_base_metadata_into_each_chunk() {
        let mut base = BTreeMap::new();
        base.insert("path".to_string(), Value::from("a.txt"));
        let chunker = TextChunker::from_config(&default_config());
        let chunks = chunker.chunk("hello world", "doc1", &base);
        assert_eq!(chunks[0].metadata.get("path").unwrap().as_str(), Some("a.txt"));
    }
}
