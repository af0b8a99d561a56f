use context_protocol::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A chunk of a document, ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub doc_id: String,
    pub index: usize,
    pub content: String,
    pub metadata: BTreeMap<String, Value>,
}

/// `sha256(f"{doc_id}:chunk:{index}")`, truncated to the first 24 hex chars.
pub fn chunk_id(doc_id: &str, index: usize) -> String {
    let raw = format!("{doc_id}:chunk:{index}");
    let digest = Sha256::digest(raw.as_bytes());
    hex_prefix(&digest, 24)
}

fn hex_prefix(bytes: &[u8], hex_len: usize) -> String {
    let mut s = String::with_capacity(hex_len);
    for byte in bytes {
        if s.len() >= hex_len {
            break;
        }
        s.push_str(&format!("{byte:02x}"));
    }
    s.truncate(hex_len);
    s
}

/// Turns raw text into [`Chunk`]s for one document.
///
/// Empty or whitespace-only input produces an empty result rather than an
/// error — there's nothing wrong with an empty file, just nothing to index.
pub trait Chunker: Send + Sync {
    fn chunk(&self, text: &str, doc_id: &str, metadata: &BTreeMap<String, Value>) -> Vec<Chunk>;
    fn name(&self) -> &str;
}
