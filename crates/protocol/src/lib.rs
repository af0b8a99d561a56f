//! Shared primitives: the metadata [`Value`] type, the recognized [`Config`]
//! structure, and allow/block path-policy matching.

pub mod config;
pub mod policy;
pub mod value;

pub use config::{
    ChunkingConfig, Config, ConfigError, EmbeddingConfig, ExtractionConfig, HybridSearchConfig,
    IndexConfig, IndexerConfig,
};
pub use value::{project_primitives, NotPrimitive, Value};
