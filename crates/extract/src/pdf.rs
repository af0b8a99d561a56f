use std::path::Path;

use context_protocol::Value;

use crate::error::{ExtractError, Result};
use crate::types::{base_metadata, check_file, Extraction, Extractor};

/// Extracts page text from PDF files via `pdf-extract`, the pure-Rust
/// substitute for the original's `pypdf` dependency (no native toolchain).
pub struct PdfExtractor;

impl Default for PdfExtractor {
    fn default() -> Self {
        Self
    }
}

impl Extractor for PdfExtractor {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
    }

    fn extract(&self, path: &Path, max_size: u64) -> Result<Extraction> {
        check_file(path, max_size)?;

        let pages = pdf_extract::extract_text_by_pages(path).map_err(|source| {
            ExtractError::DecodeError {
                path: path.to_path_buf(),
                reason: source.to_string(),
            }
        })?;

        let page_count = pages.len();
        let text = pages.join("\n\n");

        let mut metadata = base_metadata(self.name(), path);
        metadata.insert("page_count".to_string(), Value::from(page_count as i64));

        Ok(Extraction {
            text,
            metadata,
            segments: None,
        })
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supports_pdf_only() {
        let ex = PdfExtractor;
        assert!(ex.supports(Path::new("doc.pdf")));
        assert!(ex.supports(Path::new("doc.PDF")));
        assert!(!ex.supports(Path::new("doc.txt")));
    }

    #[test]
    fn rejects_missing_file() {
        let ex = PdfExtractor;
        let err = ex.extract(Path::new("/no/such/file.pdf"), 4096).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }
}
