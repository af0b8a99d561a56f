use std::collections::HashSet;
use std::path::Path;

use context_code_chunker::{AstAnalyzer, ChunkerConfig, Language, Segment};
use context_protocol::Value;

use crate::error::Result;
use crate::text::decode_with_fallback;
use crate::types::{base_metadata, check_file, Extraction, Extractor};

/// Reads source files and, for languages tree-sitter supports, attaches an
/// AST segmentation the chunker can split on instead of raw character counts.
///
/// A parse failure is not fatal: the file still extracts as plain text with
/// a `language` tag and no `segments`.
pub struct CodeExtractor {
    extensions: HashSet<String>,
    filenames: HashSet<String>,
    patterns: Vec<String>,
    parse_ast: bool,
}

impl CodeExtractor {
    pub fn new(
        extensions: impl IntoIterator<Item = String>,
        filenames: impl IntoIterator<Item = String>,
        patterns: Vec<String>,
        parse_ast: bool,
    ) -> Self {
        Self {
            extensions: extensions.into_iter().map(|e| e.to_lowercase()).collect(),
            filenames: filenames.into_iter().collect(),
            patterns,
            parse_ast,
        }
    }

    fn detect_language(&self, path: &Path) -> Language {
        Language::from_path(path)
    }
}

impl Extractor for CodeExtractor {
    fn supports(&self, path: &Path) -> bool {
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let suffix = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase());

        if let Some(suffix) = &suffix {
            if self.extensions.contains(suffix) {
                return true;
            }
        }

        if self.filenames.contains(filename) {
            return true;
        }

        self.patterns.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches(filename) || p.matches(&filename.to_lowercase()))
                .unwrap_or(false)
        })
    }

    fn extract(&self, path: &Path, max_size: u64) -> Result<Extraction> {
        check_file(path, max_size)?;

        let bytes = std::fs::read(path).map_err(|source| crate::error::ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (text, encoding) = decode_with_fallback(&bytes);

        let language = self.detect_language(path);

        let mut metadata = base_metadata(self.name(), path);
        metadata.insert("encoding".to_string(), Value::from(encoding));
        metadata.insert("language".to_string(), Value::from(language.as_str()));

        let segments = if self.parse_ast && language.supports_ast() {
            self.parse_segments(&text, path, language)
        } else {
            None
        };

        if let Some(segments) = &segments {
            metadata.insert(
                "segment_count".to_string(),
                Value::from(segments.len() as i64),
            );
        }

        Ok(Extraction {
            text,
            metadata,
            segments,
        })
    }

    fn name(&self) -> &str {
        "code"
    }
}

impl CodeExtractor {
    fn parse_segments(
        &self,
        text: &str,
        path: &Path,
        language: Language,
    ) -> Option<Vec<Segment>> {
        let mut analyzer = AstAnalyzer::new(ChunkerConfig::default(), language).ok()?;
        let chunks = analyzer
            .chunk(text, &path.to_string_lossy())
            .ok()
            .filter(|chunks| !chunks.is_empty())?;

        Some(
            chunks
                .into_iter()
                .map(|chunk| Segment {
                    content: chunk.content,
                    content_type: chunk
                        .metadata
                        .chunk_type
                        .map(|t| t.as_str().to_string())
                        .unwrap_or_else(|| "other".to_string()),
                    language: language.as_str().to_string(),
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn extractor() -> CodeExtractor {
        CodeExtractor::new(vec![".rs".to_string()], vec![], vec![], true)
    }

    #[test]
    fn supports_by_extension() {
        let ex = extractor();
        assert!(ex.supports(Path::new("main.rs")));
        assert!(!ex.supports(Path::new("main.py")));
    }

    #[test]
    fn tags_language_and_segments_functions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lib.rs");
        std::fs::write(&path, "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n").unwrap();

        let ex = extractor();
        let result = ex.extract(&path, 4096).unwrap();
        assert_eq!(result.metadata.get("language").unwrap().as_str(), Some("rust"));
        let segments = result.segments.expect("expected AST segments");
        assert!(segments.iter().any(|s| s.content_type == "function"));
    }

    #[test]
    fn language_without_ast_support_has_no_segments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.go");
        std::fs::write(&path, "package main\n").unwrap();

        let ex = CodeExtractor::new(vec![".go".to_string()], vec![], vec![], true);
        let result = ex.extract(&path, 4096).unwrap();
        assert_eq!(result.metadata.get("language").unwrap().as_str(), Some("go"));
        assert!(result.segments.is_none());
    }
}
