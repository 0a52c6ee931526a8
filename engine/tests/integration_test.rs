//! End-to-end pipeline tests: parse, index, retrieve, feedback.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use codectx_cache::PriorityTier;
use codectx_embeddings::{Embedder, EmbeddingError};
use codectx_engine::{ContextQuery, EngineConfig, MemorySourceReader, RetrievalEngine};
use codectx_retrieval::{DegradedReason, RankerConfig};
use codectx_structure::{FileStructure, StructureError, StructureExtractor, StructureItem};
use codectx_vector_store::MemoryVectorIndex;
use pretty_assertions::assert_eq;

const CONFIG_PY: &str = "\
import os

def load_config():
    path = os.environ['CONFIG']
    return parse_yaml(path)

def parse_yaml(path):
    return path";

const APP_PY: &str = "\
import config

def main():
    cfg = load_config()
    run(cfg)

def run(cfg):
    print(cfg)";

/// Line-oriented toy parser for python-ish sources. Good enough to drive
/// the pipeline; real deployments plug in a tree-sitter based extractor.
struct PythonishExtractor;

fn call_targets(body: &str, self_name: &str) -> Vec<String> {
    let chars: Vec<char> = body.chars().collect();
    let mut targets: Vec<String> = Vec::new();
    for (i, c) in chars.iter().enumerate() {
        if *c != '(' {
            continue;
        }
        let mut j = i;
        while j > 0 && (chars[j - 1].is_alphanumeric() || chars[j - 1] == '_') {
            j -= 1;
        }
        let name: String = chars[j..i].iter().collect();
        if name.is_empty() || name == self_name {
            continue;
        }
        if !targets.contains(&name) {
            targets.push(name);
        }
    }
    targets
}

#[async_trait]
impl StructureExtractor for PythonishExtractor {
    async fn parse(
        &self,
        content: &str,
        language: &str,
    ) -> Result<FileStructure, StructureError> {
        let lines: Vec<&str> = content.lines().collect();
        let mut markers: Vec<(usize, bool, String)> = Vec::new();
        let mut imports = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim_start();
            if let Some(rest) = trimmed.strip_prefix("def ") {
                let name = rest.split('(').next().unwrap_or("").trim().to_string();
                markers.push((i, false, name));
            } else if let Some(rest) = trimmed.strip_prefix("class ") {
                let name = rest.split([':', '(']).next().unwrap_or("").trim().to_string();
                markers.push((i, true, name));
            } else if let Some(rest) = trimmed.strip_prefix("import ") {
                imports.push(rest.trim().to_string());
            }
        }

        let mut functions = Vec::new();
        let mut classes = Vec::new();
        for (idx, (start, is_class, name)) in markers.iter().enumerate() {
            let end = markers
                .get(idx + 1)
                .map(|(next, _, _)| *next)
                .unwrap_or(lines.len());
            let body = lines[*start..end].join("\n");
            let item = StructureItem::new(name.as_str(), start + 1, end)
                .with_calls(call_targets(&body, name));
            if *is_class {
                classes.push(item);
            } else {
                functions.push(item);
            }
        }

        Ok(FileStructure {
            language: Some(if language.is_empty() {
                "python".to_string()
            } else {
                language.to_string()
            }),
            functions,
            classes,
            imports,
            symbols: Vec::new(),
        })
    }
}

/// Deterministic bag-of-words embedder: tokens hash into 16 buckets.
/// Can be switched into a stalled state to simulate a hung backend.
struct BagEmbedder {
    stalled: AtomicBool,
}

impl BagEmbedder {
    fn new() -> Self {
        Self {
            stalled: AtomicBool::new(false),
        }
    }

    fn stall(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Embedder for BagEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.stalled.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; 16];
                for token in text.split(|c: char| !c.is_alphanumeric() && c != '_') {
                    if token.is_empty() {
                        continue;
                    }
                    let mut hasher = DefaultHasher::new();
                    token.hash(&mut hasher);
                    vector[(hasher.finish() % 16) as usize] += 1.0;
                }
                vector
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        16
    }
}

struct Fixture {
    engine: RetrievalEngine,
    embedder: Arc<BagEmbedder>,
}

async fn fixture() -> Fixture {
    fixture_with(EngineConfig {
        ranker: RankerConfig {
            adapter_timeout_ms: 100,
            ..Default::default()
        },
        ..Default::default()
    })
    .await
}

async fn fixture_with(config: EngineConfig) -> Fixture {
    let reader = Arc::new(MemorySourceReader::new());
    reader.insert("src/config.py", CONFIG_PY).await;
    reader.insert("src/app.py", APP_PY).await;

    let embedder = Arc::new(BagEmbedder::new());
    let engine = RetrievalEngine::new(
        config,
        Arc::new(PythonishExtractor),
        embedder.clone(),
        Arc::new(MemoryVectorIndex::new()),
        reader,
    )
    .unwrap();

    engine.index_file("src/config.py").await.unwrap();
    engine.index_file("src/app.py").await.unwrap();

    Fixture { engine, embedder }
}

#[tokio::test]
async fn test_index_and_retrieve_end_to_end() {
    let Fixture { engine, .. } = fixture().await;

    let stats = engine.stats().await;
    assert_eq!(stats.graph_files, 2);
    assert_eq!(stats.vectors, 4);

    let result = engine
        .retrieve(ContextQuery::text("load_config"))
        .await
        .unwrap();

    assert!(!result.degraded);
    assert!(!result.results.is_empty());

    let load_config = result
        .results
        .iter()
        .find(|hit| hit.key.path == "src/config.py" && hit.key.start_line == 3)
        .expect("load_config block should be retrieved");
    assert_eq!(load_config.key.end_line, 6);
    assert!((load_config.structural_score - 1.0).abs() < 1e-6);

    let block = load_config.block.as_ref().expect("block extracted");
    assert!(block.content.contains("def load_config"));
    assert_eq!(block.language.as_deref(), Some("python"));
    let structural = block.structural.as_ref().expect("structural metadata");
    assert_eq!(structural.kind, "function");
    assert!(structural.dependencies.contains(&"parse_yaml".to_string()));
}

#[tokio::test]
async fn test_pinned_current_context_surfaces_at_critical() {
    let Fixture { engine, .. } = fixture().await;

    let query = ContextQuery {
        current_file: Some("src/config.py".to_string()),
        current_line: Some(4),
        ..ContextQuery::text("parse config")
    };
    let result = engine.retrieve(query).await.unwrap();

    let context = result.current_context.expect("current context echoed");
    assert_eq!(context.entity.name, "load_config");
    assert_eq!(context.key.to_string(), "src/config.py:3-6");
    assert!(context.block.is_some());

    // The enclosing function is pinned before ranking, so it shows up in
    // the results at Critical regardless of its score.
    let pinned = result
        .results
        .iter()
        .find(|hit| hit.key == context.key)
        .expect("pinned block present in results");
    assert_eq!(pinned.tier, Some(PriorityTier::Critical));
}

#[tokio::test]
async fn test_semantic_outage_degrades_to_structural() {
    let Fixture { engine, embedder } = fixture().await;
    embedder.stall();

    let result = engine
        .retrieve(ContextQuery::text("load_config"))
        .await
        .unwrap();

    assert!(result.degraded);
    assert_eq!(result.reason, Some(DegradedReason::SemanticUnavailable));
    assert!(!result.results.is_empty());
    assert!(result.results.iter().all(|hit| hit.semantic_score == 0.0));
}

#[tokio::test]
async fn test_caller_deadline_skips_cache_mutation() {
    let Fixture { engine, embedder } = fixture().await;
    // A long adapter timeout keeps the ranker waiting on the stalled
    // embedder well past the caller's deadline.
    embedder.stall();

    let before = engine.stats().await;
    let query = ContextQuery {
        deadline_ms: Some(30),
        ..ContextQuery::text("load_config")
    };
    let result = engine.retrieve(query).await.unwrap();

    assert!(result.degraded);
    assert_eq!(result.reason, Some(DegradedReason::DeadlineExceeded));
    assert!(result.results.is_empty());

    let after = engine.stats().await;
    assert_eq!(after.cache.entries, before.cache.entries);
    assert_eq!(after.cache.total_bytes, before.cache.total_bytes);
}

#[tokio::test]
async fn test_feedback_promotes_surfaced_blocks() {
    let Fixture { engine, .. } = fixture().await;

    let result = engine
        .retrieve(ContextQuery::text("load_config"))
        .await
        .unwrap();

    // Freshly admitted at Normal, then record_use lifts it to High and the
    // top-k adjustment takes it the rest of the way.
    let top = &result.results[0];
    assert!(top.block.is_some());
    assert_eq!(top.tier, Some(PriorityTier::Critical));

    // Explicit downvotes walk it back down.
    let tier = engine.record_feedback(&top.key, -2).await.unwrap();
    assert_eq!(tier, PriorityTier::Normal);
}

#[tokio::test]
async fn test_query_memoization_and_invalidation() {
    let Fixture { engine, .. } = fixture().await;
    let query = ContextQuery::text("load_config");

    let first = engine.retrieve(query.clone()).await.unwrap();
    assert!(!first.stats.from_query_cache);

    let second = engine.retrieve(query.clone()).await.unwrap();
    assert!(second.stats.from_query_cache);
    assert_eq!(second.results.len(), first.results.len());

    // Any index change invalidates memoized answers.
    let structure = PythonishExtractor
        .parse(CONFIG_PY, "python")
        .await
        .unwrap();
    engine.upsert_file("src/config.py", &structure).await.unwrap();

    let third = engine.retrieve(query).await.unwrap();
    assert!(!third.stats.from_query_cache);
}

#[tokio::test]
async fn test_rejected_file_leaves_other_files_intact() {
    let Fixture { engine, .. } = fixture().await;
    let before = engine.stats().await;

    let malformed = FileStructure {
        functions: vec![StructureItem::new("broken", 20, 10)],
        ..Default::default()
    };
    let err = engine.upsert_file("src/bad.py", &malformed).await.unwrap_err();
    assert!(err.to_string().contains("src/bad.py"));

    let after = engine.stats().await;
    assert_eq!(after.graph_files, before.graph_files);
    assert_eq!(after.graph_entities, before.graph_entities);
    assert_eq!(after.vectors, before.vectors);
}

#[tokio::test]
async fn test_remove_file_clears_all_stores() {
    let Fixture { engine, .. } = fixture().await;

    engine.remove_file("src/config.py").await.unwrap();

    let stats = engine.stats().await;
    assert_eq!(stats.graph_files, 1);
    assert_eq!(stats.vectors, 2);
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let Fixture { engine, .. } = fixture().await;
    let err = engine.retrieve(ContextQuery::text("   ")).await.unwrap_err();
    assert!(err.to_string().contains("empty"));
}

#[tokio::test]
async fn test_format_context_renders_markdown() {
    let Fixture { engine, .. } = fixture().await;

    let result = engine
        .retrieve(ContextQuery::text("load_config"))
        .await
        .unwrap();
    let (tokens, formatted) = engine.format_context(&result.results);

    assert!(tokens > 0);
    assert!(formatted.starts_with("# Relevant Codebase Context"));
    assert!(formatted.contains("```python"));
    assert!(formatted.contains("src/config.py:3-6"));

    let (no_tokens, empty) = engine.format_context(&[]);
    assert_eq!(no_tokens, 0);
    assert_eq!(empty, "");
}
