use codectx_cache::BlockKey;
use codectx_graph::EntityId;
use serde::{Deserialize, Serialize};

/// Why a ranked list was computed from fewer signals than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    /// Embedding or vector query failed or timed out
    SemanticUnavailable,
    /// No graph seed and no keyword candidates
    StructuralUnavailable,
    /// The caller's deadline expired mid-retrieval
    DeadlineExceeded,
}

/// One ranked candidate block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub key: BlockKey,

    /// Graph entity backing this block, when known
    pub entity: Option<EntityId>,

    /// Semantic similarity in [0, 1]; 0.0 when the signal had no opinion
    pub semantic_score: f32,

    /// Structural proximity in [0, 1]; 0.0 when the signal had no opinion
    pub structural_score: f32,

    /// Weighted combination the list is ordered by
    pub combined_score: f32,
}

/// Output of one ranking pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedList {
    pub results: Vec<RankedResult>,

    /// True when one signal was missing
    pub degraded: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DegradedReason>,
}

impl RankedList {
    pub fn complete(results: Vec<RankedResult>) -> Self {
        Self {
            results,
            degraded: false,
            reason: None,
        }
    }

    pub fn degraded(results: Vec<RankedResult>, reason: DegradedReason) -> Self {
        Self {
            results,
            degraded: true,
            reason: Some(reason),
        }
    }
}
