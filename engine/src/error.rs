use codectx_cache::CacheError;
use codectx_embeddings::EmbeddingError;
use codectx_graph::GraphError;
use codectx_retrieval::RetrievalError;
use codectx_structure::StructureError;
use codectx_vector_store::VectorStoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Query text is empty")]
    EmptyQuery,

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
