/// A syntactic unit an extractor found (e.g. one function or class), handed
/// to [`crate::CodeChunker`] instead of raw character offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub content: String,
    pub content_type: String,
    pub language: String,
}
