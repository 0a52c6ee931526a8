use thiserror::Error;

/// Errors that can occur during embedding operations
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Failed to initialize the embedding model
    #[error("Failed to initialize embedding model: {0}")]
    ModelInitialization(String),

    /// Failed to generate embeddings
    #[error("Failed to generate embeddings: {0}")]
    EmbeddingGeneration(String),

    /// Invalid input provided to the embedder
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend unreachable or shut down
    #[error("Embedding backend unavailable: {0}")]
    Unavailable(String),
}
