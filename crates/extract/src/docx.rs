use std::path::Path;

use context_protocol::Value;
use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild};

use crate::error::{ExtractError, Result};
use crate::types::{base_metadata, check_file, Extraction, Extractor};

/// Extracts paragraph text from DOCX files. Embedded images are counted into
/// metadata only; their bytes are never indexed.
pub struct DocxExtractor;

impl Default for DocxExtractor {
    fn default() -> Self {
        Self
    }
}

impl Extractor for DocxExtractor {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("docx"))
            .unwrap_or(false)
    }

    fn extract(&self, path: &Path, max_size: u64) -> Result<Extraction> {
        check_file(path, max_size)?;

        let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let docx = read_docx(&bytes).map_err(|source| ExtractError::DecodeError {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;

        let mut paragraphs = Vec::new();
        let mut image_count = 0i64;

        for child in &docx.document.children {
            if let DocumentChild::Paragraph(paragraph) = child {
                let mut text = String::new();
                for pchild in &paragraph.children {
                    if let ParagraphChild::Run(run) = pchild {
                        for rchild in &run.children {
                            match rchild {
                                RunChild::Text(t) => text.push_str(&t.text),
                                RunChild::Drawing(_) => image_count += 1,
                                _ => {}
                            }
                        }
                    }
                }
                if !text.trim().is_empty() {
                    paragraphs.push(text);
                }
            }
        }

        let text = paragraphs.join("\n\n");

        let mut metadata = base_metadata(self.name(), path);
        metadata.insert("image_count".to_string(), Value::from(image_count));

        Ok(Extraction {
            text,
            metadata,
            segments: None,
        })
    }

    fn name(&self) -> &str {
        "docx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supports_docx_only() {
        let ex = DocxExtractor;
        assert!(ex.supports(Path::new("report.docx")));
        assert!(!ex.supports(Path::new("report.doc")));
    }

    #[test]
    fn rejects_missing_file() {
        let ex = DocxExtractor;
        let err = ex.extract(Path::new("/no/such/file.docx"), 4096).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }
}
