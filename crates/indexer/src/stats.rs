//! Index-level statistics exposed to external callers (spec.md §6).

use std::path::PathBuf;

use context_vector_store::VectorStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of indexed chunks currently in the store.
    pub file_count: usize,
    pub db_path: PathBuf,
    /// Most recent `modified_at` seen across all indexed chunks, if any.
    pub last_indexed_at: Option<String>,
}

impl IndexStats {
    pub async fn collect(store: &dyn VectorStore, db_path: PathBuf) -> Self {
        let file_count = store.len().await;
        let last_indexed_at = store
            .enumerate_payloads()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter_map(|metadata| metadata.get("modified_at").and_then(|v| v.as_str()).map(str::to_string))
            .max();

        Self {
            file_count,
            db_path,
            last_indexed_at,
        }
    }
}
