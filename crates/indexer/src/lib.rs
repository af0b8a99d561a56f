//! # Context Indexer
//!
//! Project indexing for semantic code search.
//!
//! ## Pipeline
//!
//! ```text
//! Directory
//!     │
//!     ├──> File Scanner (.gitignore aware)
//!     │      └─> Source files
//!     │
//!     ├──> Extract + Chunk (AST-aware)
//!     │      └─> Code chunks
//!     │
//!     └──> Vector Store (batch embed)
//!            └─> Searchable index
//! ```
//!
//! [`DirectorySynchronizer`] reconciles a directory against the store once;
//! [`FsWatcher`] keeps it current afterwards; [`BackgroundIndexer`] runs both
//! in sequence and exposes progress/cancellation to a caller.

mod background;
mod error;
mod fingerprint;
mod fs_watcher;
mod scanner;
mod semantic_indexer;
mod stats;
mod synchronizer;

pub use background::{db_path_for, BackgroundIndexer, ProgressSnapshot};
pub use error::{IndexerError, Result};
pub use fingerprint::{doc_id, modified_at_iso, resolve_path};
pub use fs_watcher::FsWatcher;
pub use scanner::FileScanner;
pub use semantic_indexer::{IndexOutcome, SemanticIndexer};
pub use stats::IndexStats;
pub use synchronizer::{CancelToken, DirectorySynchronizer, ProgressCallback, SyncReport};
