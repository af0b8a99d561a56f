//! Turns a file on disk into plain text plus metadata, routed by extension,
//! filename, or glob pattern to the extractor that knows how to read it.

mod code;
mod docx;
mod error;
mod pdf;
mod router;
mod text;
mod types;

pub use code::CodeExtractor;
pub use docx::DocxExtractor;
pub use error::{ExtractError, Result};
pub use pdf::PdfExtractor;
pub use router::ExtractionRouter;
pub use text::TextExtractor;
pub use context_code_chunker::Segment;
pub use types::{Extraction, Extractor};
