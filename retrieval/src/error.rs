use codectx_embeddings::EmbeddingError;
use codectx_vector_store::VectorStoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Invalid ranker configuration: {0}")]
    InvalidConfig(String),

    #[error("No ranking signal available: semantic and structural retrieval both failed")]
    Unavailable,

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),
}
