//! Embedding + vector storage for indexed chunks.
//!
//! Two seams, mirroring spec.md §4.3/§6: an [`EmbeddingProvider`] that maps
//! text to vectors, and a [`VectorStore`] that persists `(id, vector,
//! metadata)` entries and answers kNN queries with an optional metadata
//! filter. [`OnnxEmbeddingProvider`]/[`JsonVectorStore`] are this system's
//! concrete adapters; swapping either one means writing a new
//! implementation of the trait, not touching callers.

mod error;
mod json_store;
mod provider;
mod types;

pub use error::{Result, VectorStoreError};
pub use json_store::{JsonVectorStore, VectorStore};
pub use provider::{EmbeddingProvider, OnnxEmbeddingProvider, StubEmbeddingProvider};
pub use types::{Filter, IndexedEntry};
