use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use codectx_cache::{BlockKey, ContextCache};
use codectx_embeddings::Embedder;
use codectx_graph::{EntityId, RelationshipGraph};
use codectx_vector_store::{QueryFilter, VectorHit, VectorIndex};
use tokio::time::timeout;

use crate::Result;
use crate::config::RankerConfig;
use crate::error::RetrievalError;
use crate::keyword;
use crate::result::{DegradedReason, RankedList, RankedResult};

/// One ranking request. `seed` takes precedence over the cursor position
/// for structural expansion.
#[derive(Debug, Clone, Default)]
pub struct RankRequest {
    /// Free-form query text
    pub text: String,

    /// Metadata constraints on semantic hits
    pub filter: QueryFilter,

    /// Explicit structural starting point
    pub seed: Option<EntityId>,

    /// File the caller is looking at
    pub current_file: Option<String>,

    /// 1-indexed cursor line within `current_file`
    pub current_line: Option<usize>,
}

impl RankRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct Candidate {
    entity: Option<EntityId>,
    semantic: f32,
    structural: f32,
}

/// Combines the semantic (vector similarity) and structural (graph
/// proximity) signals into one weighted ranking.
///
/// Either signal may drop out: adapter failures and timeouts on the
/// semantic side, a missing seed and no keyword hits on the structural
/// side. One missing signal degrades the result; both missing is
/// [`RetrievalError::Unavailable`]. Ranking never mutates the cache or the
/// graph, so an abandoned call leaves no trace.
pub struct HybridRanker {
    config: RankerConfig,
    vector_index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    graph: Arc<RelationshipGraph>,
    cache: Arc<ContextCache>,
}

impl HybridRanker {
    pub fn new(
        config: RankerConfig,
        vector_index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        graph: Arc<RelationshipGraph>,
        cache: Arc<ContextCache>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            vector_index,
            embedder,
            graph,
            cache,
        })
    }

    /// Rank candidate blocks for the request, best first, at most `limit`.
    pub async fn rank(&self, request: &RankRequest, limit: usize) -> Result<RankedList> {
        if limit == 0 {
            return Ok(RankedList::complete(Vec::new()));
        }
        let overfetch = limit.saturating_mul(self.config.overfetch_factor);
        let deadline = Duration::from_millis(self.config.adapter_timeout_ms);

        let mut semantic_available = true;
        let semantic_hits =
            match timeout(deadline, self.semantic_candidates(request, overfetch)).await {
                Ok(Ok(hits)) => hits,
                Ok(Err(e)) => {
                    log::warn!("Semantic retrieval failed, degrading to structural: {e}");
                    semantic_available = false;
                    Vec::new()
                }
                Err(_) => {
                    log::warn!(
                        "Semantic retrieval timed out after {}ms, degrading to structural",
                        self.config.adapter_timeout_ms
                    );
                    semantic_available = false;
                    Vec::new()
                }
            };

        let mut candidates: HashMap<BlockKey, Candidate> = HashMap::new();
        for hit in semantic_hits {
            let key = BlockKey::new(
                hit.metadata.path,
                hit.metadata.start_line,
                hit.metadata.end_line,
            );
            let score = self.config.score_mapping.similarity(hit.distance);
            let candidate = candidates.entry(key).or_default();
            candidate.semantic = candidate.semantic.max(score);
            if candidate.entity.is_none() {
                candidate.entity = Some(EntityId::from_raw(hit.id));
            }
        }

        let (structural_hits, structural_available) =
            self.structural_candidates(request).await;
        for (id, score) in structural_hits {
            let Some(entity) = self.graph.entity(&id).await else {
                continue;
            };
            // Files and placeholder symbols have no line span to extract.
            if entity.start_line == 0 {
                continue;
            }
            let key = BlockKey::new(entity.path, entity.start_line, entity.end_line);
            let candidate = candidates.entry(key).or_default();
            candidate.structural = candidate.structural.max(score);
            if candidate.entity.is_none() {
                candidate.entity = Some(id);
            }
        }

        if !semantic_available && !structural_available {
            return Err(RetrievalError::Unavailable);
        }

        let mut scored: Vec<(RankedResult, Option<u64>)> = Vec::with_capacity(candidates.len());
        for (key, candidate) in candidates {
            let combined = self.config.semantic_weight * candidate.semantic
                + self.config.structural_weight * candidate.structural;
            let last_used = self.cache.last_used(&key).await;
            scored.push((
                RankedResult {
                    key,
                    entity: candidate.entity,
                    semantic_score: candidate.semantic,
                    structural_score: candidate.structural,
                    combined_score: combined,
                },
                last_used,
            ));
        }

        // Best combined score first; ties go to the block used most
        // recently (never-cached blocks last), then stable path/line order.
        scored.sort_by(|a, b| {
            b.0.combined_score
                .total_cmp(&a.0.combined_score)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.0.key.path.cmp(&b.0.key.path))
                .then_with(|| a.0.key.start_line.cmp(&b.0.key.start_line))
                .then_with(|| a.0.key.end_line.cmp(&b.0.key.end_line))
        });
        scored.truncate(limit);
        let results: Vec<RankedResult> = scored.into_iter().map(|(r, _)| r).collect();

        let list = match (semantic_available, structural_available) {
            (true, true) => RankedList::complete(results),
            (true, false) => RankedList::degraded(results, DegradedReason::StructuralUnavailable),
            (false, true) => RankedList::degraded(results, DegradedReason::SemanticUnavailable),
            (false, false) => unreachable!("both-unavailable handled above"),
        };
        log::debug!(
            "Ranked {} candidates (degraded: {})",
            list.results.len(),
            list.degraded
        );
        Ok(list)
    }

    async fn semantic_candidates(
        &self,
        request: &RankRequest,
        k: usize,
    ) -> Result<Vec<VectorHit>> {
        let vector = self.embedder.embed_single(&request.text).await?;
        let hits = self.vector_index.query(&vector, k, &request.filter).await?;
        Ok(hits)
    }

    /// Graph-proximity candidates plus keyword hits, max-merged per entity.
    /// The second value reports whether the structural signal had anything
    /// to work with at all.
    async fn structural_candidates(
        &self,
        request: &RankRequest,
    ) -> (Vec<(EntityId, f32)>, bool) {
        let mut order: Vec<EntityId> = Vec::new();
        let mut scores: HashMap<EntityId, f32> = HashMap::new();
        let mut merge = |id: EntityId, score: f32| {
            match scores.get_mut(&id) {
                Some(existing) => *existing = existing.max(score),
                None => {
                    scores.insert(id.clone(), score);
                    order.push(id);
                }
            }
        };

        let seed = match &request.seed {
            Some(id) => self.graph.entity(id).await.map(|e| e.id),
            None => match (&request.current_file, request.current_line) {
                (Some(file), Some(line)) => {
                    self.graph.entity_at(file, line).await.map(|e| e.id)
                }
                _ => None,
            },
        };

        let mut available = false;
        if let Some(seed) = &seed {
            available = true;
            let walk = self
                .graph
                .neighbors_with_depth(seed, &[], self.config.max_depth)
                .await;
            for (id, depth) in walk {
                merge(id, 1.0 / (1.0 + depth as f32));
            }
        }

        if self.config.keyword_boost {
            let tokens = keyword::identifier_tokens(&request.text);
            for token in &tokens {
                for id in self.graph.find_by_name(token, None).await {
                    merge(id, 1.0);
                    available = true;
                }
            }

            if !tokens.is_empty() {
                let names = self.graph.entity_names(None).await;
                for token in &tokens {
                    for (name, score) in
                        keyword::fuzzy_name_scores(token, &names, self.config.fuzzy_threshold)
                    {
                        for id in self.graph.find_by_name(&name, None).await {
                            merge(id, score);
                            available = true;
                        }
                    }
                }
            }
        }

        let merged = order
            .into_iter()
            .map(|id| {
                let score = scores.get(&id).copied().unwrap_or_default();
                (id, score)
            })
            .collect();
        (merged, available)
    }
}
