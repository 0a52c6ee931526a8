use crate::error::EmbeddingError;
use crate::{COMPACT_EMBEDDING_DIM, DEFAULT_EMBEDDING_DIM};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for an embedding backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Target embedding dimension
    pub dimension: usize,

    /// Maximum batch size per backend call
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_EMBEDDING_DIM,
            batch_size: 32,
        }
    }
}

impl EmbeddingConfig {
    /// Matryoshka-truncated variant for memory-constrained deployments.
    pub fn compact() -> Self {
        Self {
            dimension: COMPACT_EMBEDDING_DIM,
            ..Self::default()
        }
    }
}

/// Black-box embedding function: text in, fixed-dimension vector out.
///
/// Implementations must be safe to call concurrently from multiple
/// retrievals.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embeddings for a list of texts, one vector per input.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Generate a single embedding for a text.
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut embeddings = self.embed(vec![text.to_string()]).await?;
        embeddings.pop().ok_or_else(|| {
            EmbeddingError::EmbeddingGeneration("No embedding generated".into())
        })
    }

    /// Dimension of vectors produced by this embedder.
    fn dimension(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Toy embedder: counts character classes. Deterministic, dimension 4.
    struct CharClassEmbedder;

    #[async_trait]
    impl Embedder for CharClassEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|t| {
                    vec![
                        t.chars().filter(|c| c.is_alphabetic()).count() as f32,
                        t.chars().filter(|c| c.is_numeric()).count() as f32,
                        t.chars().filter(|c| c.is_whitespace()).count() as f32,
                        t.len() as f32,
                    ]
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    #[tokio::test]
    async fn test_embed_single_delegates_to_batch() {
        let embedder = CharClassEmbedder;
        let vector = embedder.embed_single("fn main() {}").await.unwrap();
        assert_eq!(vector.len(), embedder.dimension());
    }

    #[tokio::test]
    async fn test_deterministic_for_fixed_input() {
        let embedder = CharClassEmbedder;
        let a = embedder.embed_single("load_config").await.unwrap();
        let b = embedder.embed_single("load_config").await.unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.dimension, DEFAULT_EMBEDDING_DIM);
        assert_eq!(config.batch_size, 32);
    }

    #[test]
    fn test_compact_config_truncates_dimension() {
        let config = EmbeddingConfig::compact();
        assert_eq!(config.dimension, COMPACT_EMBEDDING_DIM);
        assert!(config.dimension < DEFAULT_EMBEDDING_DIM);
        assert_eq!(config.batch_size, EmbeddingConfig::default().batch_size);
    }
}
