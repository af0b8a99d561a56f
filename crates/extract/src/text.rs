use std::collections::HashSet;
use std::path::Path;

use context_protocol::Value;

use crate::error::{ExtractError, Result};
use crate::types::{base_metadata, check_file, Extraction, Extractor};

/// Reads plain text files, retrying with looser encodings rather than failing.
///
/// Decode order: UTF-8 strict, then UTF-8 lossy (if only a handful of bytes
/// are invalid), then Windows-1252 (which always succeeds — every byte
/// sequence is valid Windows-1252). `TextExtractor` never returns
/// `DecodeError` for this reason; the variant exists for extractors built on
/// decoders that can genuinely fail.
pub struct TextExtractor {
    extensions: HashSet<String>,
    patterns: Vec<String>,
}

impl TextExtractor {
    pub fn new(extensions: impl IntoIterator<Item = String>, patterns: Vec<String>) -> Self {
        Self {
            extensions: extensions.into_iter().map(|e| e.to_lowercase()).collect(),
            patterns,
        }
    }
}

impl Extractor for TextExtractor {
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

        self.patterns.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches(filename) || p.matches(&filename.to_lowercase()))
                .unwrap_or(false)
        })
    }

    fn extract(&self, path: &Path, max_size: u64) -> Result<Extraction> {
        check_file(path, max_size)?;

        let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let (text, encoding) = decode_with_fallback(&bytes);

        let mut metadata = base_metadata(self.name(), path);
        metadata.insert("encoding".to_string(), Value::from(encoding));

        Ok(Extraction {
            text,
            metadata,
            segments: None,
        })
    }

    fn name(&self) -> &str {
        "text"
    }
}

/// UTF-8 strict, then UTF-8 lossy, then Windows-1252. Returns the text and
/// the name of the encoding that produced it.
///
/// `String::from_utf8_lossy` always succeeds — it replaces invalid sequences
/// with U+FFFD rather than failing — so it can't itself report whether the
/// input actually looks like mostly-valid UTF-8 with a few corrupt bytes, or
/// a genuinely different single-byte encoding. A low replacement-character
/// ratio picks the former; a high one falls through to Windows-1252, which
/// accepts every byte sequence by construction.
pub(crate) fn decode_with_fallback(bytes: &[u8]) -> (String, &'static str) {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), "utf-8");
    }

    let lossy = String::from_utf8_lossy(bytes);
    let replacements = lossy.matches('\u{FFFD}').count();
    if !bytes.is_empty() && replacements * 20 < bytes.len() {
        return (lossy.into_owned(), "utf-8");
    }

    let (cow, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    (cow.into_owned(), "windows-1252")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn extractor() -> TextExtractor {
        TextExtractor::new(vec![".txt".to_string(), ".md".to_string()], vec![])
    }

    #[test]
    fn supports_by_extension() {
        let ex = extractor();
        assert!(ex.supports(Path::new("notes.txt")));
        assert!(ex.supports(Path::new("README.MD")));
        assert!(!ex.supports(Path::new("main.rs")));
    }

    #[test]
    fn extracts_utf8_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello world").unwrap();

        let ex = extractor();
        let result = ex.extract(&path, 1024).unwrap();
        assert_eq!(result.text, "hello world");
        assert_eq!(result.metadata.get("encoding").unwrap().as_str(), Some("utf-8"));
    }

    #[test]
    fn falls_back_on_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin.txt");
        std::fs::write(&path, [0x68, 0x65, 0x6c, 0x6c, 0xE9]).unwrap();

        let ex = extractor();
        let result = ex.extract(&path, 1024).unwrap();
        assert!(result.text.starts_with("hell"));
        assert_eq!(result.metadata.get("encoding").unwrap().as_str(), Some("windows-1252"));
    }

    #[test]
    fn mostly_utf8_with_one_stray_byte_stays_tagged_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mostly_utf8.txt");
        let mut bytes = "the quick brown fox jumps over the lazy dog ".repeat(5).into_bytes();
        bytes.push(0xE9);
        std::fs::write(&path, &bytes).unwrap();

        let ex = extractor();
        let result = ex.extract(&path, 1024 * 1024).unwrap();
        assert_eq!(result.metadata.get("encoding").unwrap().as_str(), Some("utf-8"));
        assert!(result.text.ends_with('\u{FFFD}'));
    }

    #[test]
    fn too_large_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "0123456789").unwrap();

        let ex = extractor();
        let err = ex.extract(&path, 5).unwrap_err();
        assert!(matches!(err, ExtractError::TooLarge { .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let ex = extractor();
        let err = ex.extract(Path::new("/no/such/file.txt"), 1024).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }
}
