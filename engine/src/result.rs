use codectx_cache::{BlockKey, CacheStats, ContextBlock, PriorityTier};
use codectx_graph::CodeEntity;
use codectx_retrieval::DegradedReason;
use serde::{Deserialize, Serialize};

/// One surfaced context block with its ranking provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextHit {
    pub key: BlockKey,

    pub semantic_score: f32,
    pub structural_score: f32,
    pub combined_score: f32,

    /// The extracted content. `None` when extraction was skipped (deadline)
    /// or the source could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<ContextBlock>,

    /// Cache tier after this retrieval's feedback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<PriorityTier>,
}

/// The caller's enclosing entity, pinned before ranking so it survives any
/// eviction pressure the retrieval itself creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentContext {
    pub entity: CodeEntity,
    pub key: BlockKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<ContextBlock>,
}

/// Per-stage timings and counters for one retrieval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalStats {
    pub ranking_ms: u64,
    pub extraction_ms: u64,
    pub total_ms: u64,
    pub candidates: usize,
    /// Answer came from the whole-query memo; no ranking or feedback ran
    pub from_query_cache: bool,
}

/// Full answer to one [`crate::ContextQuery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub query_text: String,
    pub results: Vec<ContextHit>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_context: Option<CurrentContext>,

    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DegradedReason>,

    pub stats: RetrievalStats,
}

/// Point-in-time counters across the engine's stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub cache: CacheStats,
    pub graph_entities: usize,
    pub graph_files: usize,
    pub vectors: usize,
}
