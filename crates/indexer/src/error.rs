use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extraction error: {0}")]
    Extract(#[from] context_extract::ExtractError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] context_vector_store::VectorStoreError),

    #[error("sync cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}
