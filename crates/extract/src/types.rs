use context_code_chunker::Segment;
use context_protocol::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ExtractError, Result};

/// Extracted plain text plus the metadata the extractor attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub text: String,
    pub metadata: BTreeMap<String, Value>,
    /// AST segments, when the extractor parsed the content and found any.
    pub segments: Option<Vec<Segment>>,
}

/// A source of extractable text for a single file type or family of types.
pub trait Extractor: Send + Sync {
    fn supports(&self, path: &Path) -> bool;
    fn extract(&self, path: &Path, max_size: u64) -> Result<Extraction>;
    fn name(&self) -> &str;
}

/// Common preflight: file exists, is a regular file, and is within `max_size`.
pub(crate) fn check_file(path: &Path, max_size: u64) -> Result<u64> {
    let meta = std::fs::metadata(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ExtractError::NotFound(path.to_path_buf())
        } else {
            ExtractError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    if !meta.is_file() {
        return Err(ExtractError::NotAFile(path.to_path_buf()));
    }

    if meta.len() > max_size {
        return Err(ExtractError::TooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            max: max_size,
        });
    }

    Ok(meta.len())
}

pub(crate) fn base_metadata(
    extractor: &str,
    path: &Path,
) -> BTreeMap<String, Value> {
    let mut metadata = BTreeMap::new();
    metadata.insert("extractor".to_string(), Value::from(extractor));
    metadata.insert(
        "path".to_string(),
        Value::from(path.to_string_lossy().to_string()),
    );
    metadata.insert(
        "filename".to_string(),
        Value::from(
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        ),
    );
    metadata.insert(
        "extension".to_string(),
        Value::from(
            path.extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default(),
        ),
    );
    metadata
}
