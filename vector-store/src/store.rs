use crate::error::VectorStoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata stored alongside each vector. Carries enough to rebuild the
/// context-block key `(path, start_line, end_line)` at query time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    /// Source file path
    pub path: String,

    /// Starting line number (1-indexed)
    pub start_line: usize,

    /// Ending line number (1-indexed, inclusive)
    pub end_line: usize,

    /// Language tag
    #[serde(default)]
    pub language: Option<String>,

    /// Owning project identifier
    #[serde(default)]
    pub project: Option<String>,
}

/// A ranked hit from a similarity query
#[derive(Debug, Clone)]
pub struct VectorHit {
    /// Stable identifier passed at upsert time
    pub id: String,

    /// Metadata passed at upsert time
    pub metadata: VectorMetadata,

    /// Distance from the query vector (lower is better)
    pub distance: f32,
}

/// Optional structured filter applied before ranking
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub project: Option<String>,
}

impl QueryFilter {
    /// True when no constraint is set
    pub fn is_empty(&self) -> bool {
        self.language.is_none() && self.project.is_none()
    }

    /// Check metadata against this filter
    pub fn matches(&self, metadata: &VectorMetadata) -> bool {
        if let Some(language) = &self.language {
            if metadata.language.as_deref() != Some(language.as_str()) {
                return false;
            }
        }
        if let Some(project) = &self.project {
            if metadata.project.as_deref() != Some(project.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Mapping from backend distance to a similarity score in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMapping {
    /// `1 - distance`, clamped; fits cosine distance in [0, 2]
    #[default]
    OneMinusDistance,
    /// `e^(-distance)`; fits unbounded distances (L2)
    ExpDecay,
}

impl ScoreMapping {
    /// Convert a raw distance into a similarity score in [0, 1].
    pub fn similarity(self, distance: f32) -> f32 {
        match self {
            ScoreMapping::OneMinusDistance => (1.0 - distance).clamp(0.0, 1.0),
            ScoreMapping::ExpDecay => (-distance.max(0.0)).exp().clamp(0.0, 1.0),
        }
    }
}

/// Abstract similarity-search backend.
///
/// Both operations must be safe to call concurrently from multiple
/// retrievals; a re-upsert of an existing id replaces its vector and
/// metadata.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace a vector under a stable id.
    async fn upsert(
        &self,
        id: String,
        vector: Vec<f32>,
        metadata: VectorMetadata,
    ) -> Result<(), VectorStoreError>;

    /// Return the `k` nearest entries, ascending by distance; ties broken
    /// by id for determinism.
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: &QueryFilter,
    ) -> Result<Vec<VectorHit>, VectorStoreError>;

    /// Drop every entry whose metadata path matches.
    async fn remove_path(&self, path: &str) -> Result<usize, VectorStoreError>;

    /// Number of stored vectors.
    async fn len(&self) -> usize;
}
