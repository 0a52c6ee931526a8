use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use codectx_cache::{BlockKey, CacheError, ContextBlock, ContextCache, PriorityTier, StructuralInfo};
use codectx_embeddings::Embedder;
use codectx_graph::{CodeEntity, EntityId, RelationKind, RelationshipGraph};
use codectx_retrieval::{DegradedReason, HybridRanker, RankRequest, RankedResult};
use codectx_structure::{FileStructure, StructureExtractor, StructureItem};
use codectx_vector_store::{VectorIndex, VectorMetadata};
use log::{debug, info, warn};
use lru::LruCache;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::Result;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::query::{ContextQuery, QueryKey};
use crate::result::{ContextHit, CurrentContext, EngineStats, RetrievalResult, RetrievalStats};
use crate::source::{SourceReader, language_for_path, slice_lines};

/// Facade over the indexing and retrieval pipeline.
///
/// Owns the relationship graph and the context cache; the structure
/// extractor, embedder, vector index, and source reader are injected
/// adapters. One engine serves one project tree.
pub struct RetrievalEngine {
    config: EngineConfig,
    extractor: Arc<dyn StructureExtractor>,
    embedder: Arc<dyn Embedder>,
    vector_index: Arc<dyn VectorIndex>,
    reader: Arc<dyn SourceReader>,
    graph: Arc<RelationshipGraph>,
    cache: Arc<ContextCache>,
    ranker: HybridRanker,
    query_cache: Mutex<LruCache<QueryKey, RetrievalResult>>,
}

impl RetrievalEngine {
    pub fn new(
        config: EngineConfig,
        extractor: Arc<dyn StructureExtractor>,
        embedder: Arc<dyn Embedder>,
        vector_index: Arc<dyn VectorIndex>,
        reader: Arc<dyn SourceReader>,
    ) -> Result<Self> {
        config.validate()?;
        let graph = Arc::new(RelationshipGraph::new(config.graph.clone())?);
        let cache = Arc::new(ContextCache::new(config.cache.clone())?);
        let ranker = HybridRanker::new(
            config.ranker.clone(),
            vector_index.clone(),
            embedder.clone(),
            graph.clone(),
            cache.clone(),
        )?;
        let memo_size = NonZeroUsize::new(config.query_cache_size).ok_or_else(|| {
            EngineError::InvalidConfig("query_cache_size must be greater than zero".to_string())
        })?;

        Ok(Self {
            config,
            extractor,
            embedder,
            vector_index,
            reader,
            graph,
            cache,
            ranker,
            query_cache: Mutex::new(LruCache::new(memo_size)),
        })
    }

    /// Parse a source file through the structure extractor and index it.
    pub async fn index_file(&self, path: &str) -> Result<()> {
        let content = self.reader.read(path).await?;
        let language = language_for_path(path).unwrap_or_default();
        let structure = self.extractor.parse(&content, &language).await?;
        self.upsert_file(path, &structure).await
    }

    /// Index a parsed file: update the graph, embed each function and class
    /// span into the vector index, and invalidate everything cached for the
    /// superseded revision. A malformed structure rejects this file only.
    pub async fn upsert_file(&self, path: &str, structure: &FileStructure) -> Result<()> {
        self.graph.upsert_file(path, structure).await?;

        let dropped_blocks = self.cache.invalidate_path(path).await;
        let dropped_vectors = self.vector_index.remove_path(path).await?;
        debug!(
            "Superseded revision of {path}: {dropped_blocks} cached blocks, \
             {dropped_vectors} vectors dropped"
        );

        let members: Vec<&StructureItem> = structure
            .functions
            .iter()
            .chain(structure.classes.iter())
            .collect();
        if !members.is_empty() {
            let content = match self.reader.read(path).await {
                Ok(content) => Some(content),
                Err(e) => {
                    warn!("Cannot read {path} for embedding, semantic hits will miss it: {e}");
                    None
                }
            };
            if let Some(content) = content {
                let language = structure
                    .language
                    .clone()
                    .or_else(|| language_for_path(path));
                let texts: Vec<String> = members
                    .iter()
                    .map(|item| slice_lines(&content, item.start_line, item.end_line))
                    .collect();
                let vectors = self.embedder.embed(texts).await?;
                for (item, vector) in members.iter().zip(vectors) {
                    let id = EntityId::new(path, &item.name, item.start_line, item.end_line);
                    self.vector_index
                        .upsert(
                            id.to_string(),
                            vector,
                            VectorMetadata {
                                path: path.to_string(),
                                start_line: item.start_line,
                                end_line: item.end_line,
                                language: language.clone(),
                                project: None,
                            },
                        )
                        .await?;
                }
            }
        }

        self.query_cache.lock().await.clear();
        info!("Indexed {path} ({} items)", structure.item_count());
        Ok(())
    }

    /// Remove a file from the graph, the vector index, and the cache.
    pub async fn remove_file(&self, path: &str) -> Result<()> {
        let entities = self.graph.remove_file(path).await;
        let blocks = self.cache.invalidate_path(path).await;
        let vectors = self.vector_index.remove_path(path).await?;
        self.query_cache.lock().await.clear();
        debug!("Removed {path}: {entities} entities, {blocks} blocks, {vectors} vectors");
        Ok(())
    }

    /// Answer a context query: pin the caller's current entity, rank
    /// candidates, materialize their blocks, and feed usage back into the
    /// cache tiers.
    pub async fn retrieve(&self, query: ContextQuery) -> Result<RetrievalResult> {
        let started = Instant::now();
        let limit = query.effective_limit(&self.config)?;
        let deadline = query.deadline_ms.map(Duration::from_millis);

        let memo_key = query.memo_key(limit);
        if let Some(cached) = self.query_cache.lock().await.get(&memo_key) {
            debug!("Query cache hit for '{}'", query.text);
            let mut result = cached.clone();
            result.stats.from_query_cache = true;
            return Ok(result);
        }

        // Pin before ranking so the current context cannot be evicted by
        // blocks this retrieval admits.
        let current_context = self.pin_current_context(&query).await?;

        let request = RankRequest {
            text: query.text.clone(),
            filter: query.filter.clone(),
            seed: None,
            current_file: query.current_file.clone(),
            current_line: query.current_line,
        };

        let ranking_started = Instant::now();
        let ranked = match deadline {
            Some(total) => {
                let remaining = total.saturating_sub(started.elapsed());
                match timeout(remaining, self.ranker.rank(&request, limit)).await {
                    Ok(list) => list?,
                    Err(_) => {
                        warn!("Retrieval deadline expired during ranking for '{}'", query.text);
                        return Ok(RetrievalResult {
                            query_text: query.text,
                            results: Vec::new(),
                            current_context,
                            degraded: true,
                            reason: Some(DegradedReason::DeadlineExceeded),
                            stats: RetrievalStats {
                                ranking_ms: ranking_started.elapsed().as_millis() as u64,
                                total_ms: started.elapsed().as_millis() as u64,
                                ..Default::default()
                            },
                        });
                    }
                }
            }
            None => self.ranker.rank(&request, limit).await?,
        };
        let ranking_ms = ranking_started.elapsed().as_millis() as u64;

        // Materialize blocks until the deadline cuts us off. Past that
        // point results keep their scores but carry no content, and no
        // cache state changes anymore.
        let extraction_started = Instant::now();
        let expired = || deadline.is_some_and(|total| started.elapsed() >= total);
        let mut deadline_hit = false;
        let mut hits: Vec<ContextHit> = Vec::with_capacity(ranked.results.len());
        for result in &ranked.results {
            let block = if deadline_hit || expired() {
                deadline_hit = true;
                None
            } else {
                match self.cache.get(&result.key).await {
                    Some(block) => Some(block),
                    None => self.extract_and_admit(result).await?,
                }
            };
            hits.push(ContextHit {
                key: result.key.clone(),
                semantic_score: result.semantic_score,
                structural_score: result.structural_score,
                combined_score: result.combined_score,
                block,
                tier: None,
            });
        }
        let extraction_ms = extraction_started.elapsed().as_millis() as u64;

        if !deadline_hit {
            for (position, hit) in hits.iter().enumerate() {
                if hit.block.is_none() {
                    continue;
                }
                if self.cache.record_use(&hit.key).await.is_err() {
                    continue;
                }
                if position < self.config.feedback_top_k {
                    let _ = self.cache.adjust_priority(&hit.key, 1).await;
                }
            }
        }
        for hit in &mut hits {
            hit.tier = self.cache.tier(&hit.key).await;
        }

        let degraded = ranked.degraded || deadline_hit;
        let reason = if deadline_hit {
            Some(DegradedReason::DeadlineExceeded)
        } else {
            ranked.reason
        };

        let result = RetrievalResult {
            query_text: query.text,
            results: hits,
            current_context,
            degraded,
            reason,
            stats: RetrievalStats {
                ranking_ms,
                extraction_ms,
                total_ms: started.elapsed().as_millis() as u64,
                candidates: ranked.results.len(),
                from_query_cache: false,
            },
        };

        if !result.degraded {
            self.query_cache
                .lock()
                .await
                .put(memo_key, result.clone());
        }
        Ok(result)
    }

    /// Bump (or drop) a block's tier on explicit consumer feedback.
    pub async fn record_feedback(&self, key: &BlockKey, delta: i32) -> Result<PriorityTier> {
        Ok(self.cache.adjust_priority(key, delta).await?)
    }

    /// Markdown rendering of surfaced blocks for prompt injection, with a
    /// rough 4-chars-per-token estimate.
    pub fn format_context(&self, hits: &[ContextHit]) -> (usize, String) {
        let with_content: Vec<&ContextHit> =
            hits.iter().filter(|h| h.block.is_some()).collect();
        if with_content.is_empty() {
            return (0, String::new());
        }

        let mut formatted = String::from("# Relevant Codebase Context\n\n");
        let mut tokens = 50; // Header overhead

        for (i, hit) in with_content.iter().enumerate() {
            let Some(block) = &hit.block else { continue };

            let header = format!("## {}. `{}`\n", i + 1, hit.key);
            formatted.push_str(&header);
            formatted.push_str(&format!(
                "_Relevance: {:.2} (semantic {:.2}, structural {:.2})_\n\n",
                hit.combined_score, hit.semantic_score, hit.structural_score
            ));

            formatted.push_str("```");
            formatted.push_str(block.language.as_deref().unwrap_or(""));
            formatted.push('\n');
            formatted.push_str(&block.content);
            if !block.content.ends_with('\n') {
                formatted.push('\n');
            }
            formatted.push_str("```\n\n");

            tokens += (header.len() + block.content.len()) / 4 + 20;
        }

        (tokens, formatted)
    }

    pub async fn stats(&self) -> EngineStats {
        EngineStats {
            cache: self.cache.stats().await,
            graph_entities: self.graph.entity_count().await,
            graph_files: self.graph.file_count().await,
            vectors: self.vector_index.len().await,
        }
    }

    /// Pin the entity enclosing the caller's cursor at `Critical`.
    /// A full cache that cannot admit it even after evicting everything
    /// evictable is a hard error; an unreadable source file only costs the
    /// pinned content.
    async fn pin_current_context(&self, query: &ContextQuery) -> Result<Option<CurrentContext>> {
        let (Some(file), Some(line)) = (&query.current_file, query.current_line) else {
            return Ok(None);
        };
        let Some(entity) = self.graph.entity_at(file, line).await else {
            return Ok(None);
        };
        // The file-level fallback has no line span to pin.
        if entity.start_line == 0 {
            return Ok(None);
        }

        let key = BlockKey::new(file.clone(), entity.start_line, entity.end_line);
        let content = match self.reader.read(file).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Cannot read {file} to pin current context: {e}");
                return Ok(Some(CurrentContext {
                    entity,
                    key,
                    block: None,
                }));
            }
        };

        let snippet = slice_lines(&content, entity.start_line, entity.end_line);
        let mut block = ContextBlock::new(key.clone(), snippet)
            .with_structural(self.structural_info(&entity).await);
        if let Some(language) = language_for_path(file) {
            block = block.with_language(language);
        }
        self.cache.put(block.clone(), PriorityTier::Critical).await?;
        debug!("Pinned current context {key} at critical");

        Ok(Some(CurrentContext {
            entity,
            key,
            block: Some(block),
        }))
    }

    /// Read, slice, and cache the block behind a ranked candidate. Returns
    /// `None` when the source is unreadable; a block too large for the
    /// budget is surfaced uncached.
    async fn extract_and_admit(&self, result: &RankedResult) -> Result<Option<ContextBlock>> {
        let content = match self.reader.read(&result.key.path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Cannot read {} for extraction: {e}", result.key.path);
                return Ok(None);
            }
        };

        let snippet = slice_lines(&content, result.key.start_line, result.key.end_line);
        let mut block = ContextBlock::new(result.key.clone(), snippet);
        if let Some(language) = language_for_path(&result.key.path) {
            block = block.with_language(language);
        }
        if let Some(id) = &result.entity {
            if let Some(entity) = self.graph.entity(id).await {
                block = block.with_structural(self.structural_info(&entity).await);
            }
        }

        match self.cache.put(block.clone(), PriorityTier::Normal).await {
            Ok(()) => {}
            Err(CacheError::CapacityExceeded { needed, budget, .. }) => {
                warn!(
                    "Block {} not admitted ({needed} bytes over a {budget} byte budget)",
                    block.key
                );
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Some(block))
    }

    async fn structural_info(&self, entity: &CodeEntity) -> StructuralInfo {
        let mut dependencies = Vec::new();
        for id in self
            .graph
            .outgoing(&entity.id, &[RelationKind::Calls, RelationKind::Uses])
            .await
        {
            if let Some(target) = self.graph.entity(&id).await {
                dependencies.push(target.name);
            }
        }
        StructuralInfo {
            kind: entity.kind.as_str().to_string(),
            name: entity.name.clone(),
            dependencies,
        }
    }
}
