use std::path::PathBuf;
use thiserror::Error;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors that can occur while extracting text from a file.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("not a file: {0}")]
    NotAFile(PathBuf),

    #[error("no extractor registered for: {0}")]
    Unsupported(PathBuf),

    #[error("file too large: {path} is {size} bytes, max is {max} bytes")]
    TooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("failed to decode {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
