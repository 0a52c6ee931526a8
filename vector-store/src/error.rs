use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Vector store initialization failed: {0}")]
    Initialization(String),

    #[error("Upsert failed: {0}")]
    UpsertFailed(String),

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector store unavailable: {0}")]
    Unavailable(String),
}
