use std::collections::BTreeMap;

use context_protocol::{ChunkingConfig, Value};

use crate::chunk::{chunk_id, Chunk, Chunker};
use crate::segment::Segment;
use crate::splitter::recursive_split;

/// Chunks code either from pre-parsed AST segments (one chunk per function,
/// class, ...) or, when none are available, via a language-aware recursive
/// splitter that prefers declaration boundaries over raw character counts.
pub struct CodeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    #[allow(dead_code)]
    use_ast_chunks: bool,
}

impl CodeChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize, use_ast_chunks: bool) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            use_ast_chunks,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap, config.use_ast_chunks)
    }

    fn splitter_separators(language: Option<&str>) -> Vec<String> {
        match language {
            Some("python") => vec![
                "\nclass ".to_string(),
                "\ndef ".to_string(),
                "\n\ndef ".to_string(),
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
            ],
            Some("javascript") | Some("typescript") => vec![
                "\nclass ".to_string(),
                "\nfunction ".to_string(),
                "\nexport ".to_string(),
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
            ],
            Some(_) => vec![
                "\nclass ".to_string(),
                "\nfn ".to_string(),
                "\nimpl ".to_string(),
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
            ],
            None => vec!["\n\n".to_string(), "\n".to_string(), " ".to_string(), String::new()],
        }
    }

    /// Chunk code using pre-parsed AST segments: one chunk per segment, with
    /// oversized segments re-split by the language-aware splitter and tagged
    /// `is_split`/`split_part`/`split_total`.
    pub fn chunk_with_segments(
        &self,
        text: &str,
        doc_id: &str,
        segments: &[Segment],
        metadata: &BTreeMap<String, Value>,
    ) -> Vec<Chunk> {
        if segments.is_empty() {
            return self.chunk(text, doc_id, metadata);
        }

        let mut chunks = Vec::new();
        let mut index = 0usize;

        for segment in segments {
            if segment.content.trim().is_empty() {
                continue;
            }

            if segment.content.chars().count() > self.chunk_size {
                let separators = Self::splitter_separators(Some(segment.language.as_str()));
                let parts = recursive_split(&segment.content, self.chunk_size, self.chunk_overlap, &separators);
                let split_total = parts.len();

                for (part_idx, content) in parts.into_iter().enumerate() {
                    let mut chunk_metadata = metadata.clone();
                    chunk_metadata.insert("chunker".to_string(), Value::from(self.name()));
                    chunk_metadata.insert("chunk_index".to_string(), Value::from(index as i64));
                    chunk_metadata.insert("chunk_type".to_string(), Value::from(segment.content_type.as_str()));
                    chunk_metadata.insert("is_split".to_string(), Value::from(true));
                    chunk_metadata.insert("split_part".to_string(), Value::from((part_idx + 1) as i64));
                    chunk_metadata.insert("split_total".to_string(), Value::from(split_total as i64));

                    chunks.push(Chunk {
                        id: chunk_id(doc_id, index),
                        doc_id: doc_id.to_string(),
                        index,
                        content,
                        metadata: chunk_metadata,
                    });
                    index += 1;
                }
            } else {
                let mut chunk_metadata = metadata.clone();
                chunk_metadata.insert("chunker".to_string(), Value::from(self.name()));
                chunk_metadata.insert("chunk_index".to_string(), Value::from(index as i64));
                chunk_metadata.insert("chunk_type".to_string(), Value::from(segment.content_type.as_str()));

                chunks.push(Chunk {
                    id: chunk_id(doc_id, index),
                    doc_id: doc_id.to_string(),
                    index,
                    content: segment.content.clone(),
                    metadata: chunk_metadata,
                });
                index += 1;
            }
        }

        let total = chunks.len();
        for chunk in &mut chunks {
            chunk
                .metadata
                .insert("total_chunks".to_string(), Value::from(total as i64));
        }

        chunks
    }
}

impl Chunker for CodeChunker {
    fn chunk(&self, text: &str, doc_id: &str, metadata: &BTreeMap<String, Value>) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let language = metadata.get("language").and_then(|v| v.as_str());
        let separators = Self::splitter_separators(language);
        let pieces = recursive_split(text, self.chunk_size, self.chunk_overlap, &separators);
        let total = pieces.len();

        pieces
            .into_iter()
            .enumerate()
            .map(|(index, content)| {
                let mut chunk_metadata = metadata.clone();
                chunk_metadata.insert("chunker".to_string(), Value::from(self.name()));
                chunk_metadata.insert("chunk_index".to_string(), Value::from(index as i64));
                chunk_metadata.insert("total_chunks".to_string(), Value::from(total as i64));
                chunk_metadata.insert("chunk_type".to_string(), Value::from("code"));

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
        "code"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: 40,
            chunk_overlap: 0,
            ..Default::default()
        }
    }

    #[test]
    fn segments_become_one_chunk_each() {
        let chunker = CodeChunker::from_config(&config());
        let segments = vec![
            Segment {
                content: "fn a() {}".to_string(),
                content_type: "function".to_string(),
                language: "rust".to_string(),
            },
            Segment {
                content: "fn b() {}".to_string(),
                content_type: "function".to_string(),
                language: "rust".to_string(),
            },
        ];
        let chunks = chunker.chunk_with_segments("ignored", "doc1", &segments, &BTreeMap::new());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.get("chunk_type").unwrap().as_str(), Some("function"));
        assert_eq!(chunks[0].metadata.get("total_chunks").unwrap().as_i64(), Some(2));
        assert!(chunks[0].metadata.get("is_split").is_none());
    }

    #[test]
    fn oversized_segment_is_split_and_tagged() {
        let chunker = CodeChunker::from_config(&config());
        let big = format!("fn big() {{\n{}\n}}", "x = 1;\n".repeat(20));
        let segments = vec![Segment {
            content: big,
            content_type: "function".to_string(),
            language: "rust".to_string(),
        }];
        let chunks = chunker.chunk_with_segments("ignored", "doc1", &segments, &BTreeMap::new());
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.get("is_split").unwrap().as_bool(), Some(true));
            assert_eq!(chunk.metadata.get("split_part").unwrap().as_i64(), Some((i + 1) as i64));
        }
    }

    #[test]
    fn no_segments_falls_back_to_language_aware_split() {
        let chunker = CodeChunker::from_config(&config());
        let mut metadata = BTreeMap::new();
        metadata.insert("language".to_string(), Value::from("rust"));
        let chunks = chunker.chunk("fn a() {}\nfn b() {}", "doc1", &metadata);
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].metadata.get("chunk_type").unwrap().as_str(), Some("code"));
    }

    #[test]
    fn empty_segments_list_falls_back_to_chunk() {
        let chunker = CodeChunker::from_config(&config());
        let chunks = chunker.chunk_with_segments("fn a() {}", "doc1", &[], &BTreeMap::new());
        assert!(!chunks.is_empty());
    }
}
