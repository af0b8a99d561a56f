use std::path::Path;

use crate::error::{ExtractError, Result};
use crate::types::{Extraction, Extractor};

/// Ordered registry of extractors. The first registered extractor whose
/// `supports()` matches wins — registration order is the tie-break.
#[derive(Default)]
pub struct ExtractionRouter {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.get_extractor(path).is_some()
    }

    pub fn get_extractor(&self, path: &Path) -> Option<&dyn Extractor> {
        self.extractors
            .iter()
            .map(|e| e.as_ref())
            .find(|e| e.supports(path))
    }

    pub fn extract(&self, path: &Path, max_size: u64) -> Result<Extraction> {
        let extractor = self
            .get_extractor(path)
            .ok_or_else(|| ExtractError::Unsupported(path.to_path_buf()))?;
        extractor.extract(path, max_size)
    }

    /// Extract content, returning `None` instead of propagating the error.
    pub fn extract_safe(&self, path: &Path, max_size: u64) -> Option<Extraction> {
        self.extract(path, max_size).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::CodeExtractor;
    use crate::text::TextExtractor;
    use tempfile::TempDir;

    fn router() -> ExtractionRouter {
        ExtractionRouter::new()
            .register(CodeExtractor::new(vec![".rs".to_string()], vec![], vec![], true))
            .register(TextExtractor::new(vec![".txt".to_string()], vec![]))
    }

    #[test]
    fn first_registered_match_wins() {
        let dir = TempDir::new().unwrap();
        let rs_path = dir.path().join("a.rs");
        std::fs::write(&rs_path, "fn main() {}").unwrap();
        let txt_path = dir.path().join("a.txt");
        std::fs::write(&txt_path, "hello").unwrap();

        let router = router();
        assert_eq!(router.get_extractor(&rs_path).unwrap().name(), "code");
        assert_eq!(router.get_extractor(&txt_path).unwrap().name(), "text");
    }

    #[test]
    fn unsupported_extension_errors() {
        let router = router();
        let err = router
            .extract(Path::new("/tmp/unsupported.xyz"), 4096)
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(_)));
    }

    #[test]
    fn extract_safe_swallows_errors() {
        let router = router();
        assert!(router
            .extract_safe(Path::new("/tmp/unsupported.xyz"), 4096)
            .is_none());
    }
}
