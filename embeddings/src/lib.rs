//! # Codectx Embeddings
//!
//! Boundary for the text-embedding function used by semantic search. The
//! model itself lives outside this workspace; callers hand the engine an
//! [`Embedder`] implementation and the engine treats it as a black box
//! `text -> vector`. Embeddings are assumed deterministic for a fixed model
//! version; callers must re-embed after a model upgrade.

mod error;
mod service;

pub use error::EmbeddingError;
pub use service::{Embedder, EmbeddingConfig};

/// Default embedding dimension (nomic-embed-text-v1.5 family)
pub const DEFAULT_EMBEDDING_DIM: usize = 768;

/// Compact embedding dimension (Matryoshka truncation)
pub const COMPACT_EMBEDDING_DIM: usize = 256;

pub type Result<T> = std::result::Result<T, EmbeddingError>;
