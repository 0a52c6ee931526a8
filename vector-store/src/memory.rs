use crate::error::VectorStoreError;
use crate::store::{QueryFilter, VectorHit, VectorIndex, VectorMetadata};
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredVector {
    vector: Vec<f32>,
    metadata: VectorMetadata,
}

/// In-memory cosine-distance index.
///
/// Reference backend: brute-force scan, suitable for tests and small
/// projects. Distance is `1 - cosine_similarity`, so it pairs with
/// [`crate::ScoreMapping::OneMinusDistance`].
#[derive(Default)]
pub struct MemoryVectorIndex {
    entries: RwLock<HashMap<String, StoredVector>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(
        &self,
        id: String,
        vector: Vec<f32>,
        metadata: VectorMetadata,
    ) -> Result<(), VectorStoreError> {
        if vector.is_empty() {
            return Err(VectorStoreError::UpsertFailed(format!(
                "empty vector for id '{id}'"
            )));
        }

        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(&id) {
            if existing.vector.len() != vector.len() {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: existing.vector.len(),
                    actual: vector.len(),
                });
            }
        }
        entries.insert(id, StoredVector { vector, metadata });
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: &QueryFilter,
    ) -> Result<Vec<VectorHit>, VectorStoreError> {
        if vector.is_empty() {
            return Err(VectorStoreError::SearchFailed("empty query vector".into()));
        }

        let entries = self.entries.read().await;

        let mut hits: Vec<VectorHit> = entries
            .iter()
            .filter(|(_, stored)| filter.matches(&stored.metadata))
            .map(|(id, stored)| VectorHit {
                id: id.clone(),
                metadata: stored.metadata.clone(),
                distance: 1.0 - cosine_similarity(vector, &stored.vector),
            })
            .collect();

        // Ascending distance, id tiebreak keeps results stable across runs.
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);

        debug!("Vector query returned {} hits (k={k})", hits.len());
        Ok(hits)
    }

    async fn remove_path(&self, path: &str) -> Result<usize, VectorStoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, stored| stored.metadata.path != path);
        Ok(before - entries.len())
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn metadata(path: &str, language: Option<&str>) -> VectorMetadata {
        VectorMetadata {
            path: path.to_string(),
            start_line: 1,
            end_line: 10,
            language: language.map(str::to_string),
            project: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_len() {
        let index = MemoryVectorIndex::new();
        index
            .upsert("a".into(), vec![1.0, 0.0], metadata("a.rs", None))
            .await
            .unwrap();
        index
            .upsert("b".into(), vec![0.0, 1.0], metadata("b.rs", None))
            .await
            .unwrap();

        assert_eq!(index.len().await, 2);

        // Re-upsert replaces, not duplicates
        index
            .upsert("a".into(), vec![0.5, 0.5], metadata("a.rs", None))
            .await
            .unwrap();
        assert_eq!(index.len().await, 2);
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let index = MemoryVectorIndex::new();
        index
            .upsert("near".into(), vec![1.0, 0.0], metadata("near.rs", None))
            .await
            .unwrap();
        index
            .upsert("far".into(), vec![0.0, 1.0], metadata("far.rs", None))
            .await
            .unwrap();

        let hits = index
            .query(&[1.0, 0.1], 2, &QueryFilter::default())
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "near");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[tokio::test]
    async fn test_query_respects_filter_and_k() {
        let index = MemoryVectorIndex::new();
        index
            .upsert(
                "py".into(),
                vec![1.0, 0.0],
                metadata("a.py", Some("python")),
            )
            .await
            .unwrap();
        index
            .upsert("rs".into(), vec![1.0, 0.0], metadata("a.rs", Some("rust")))
            .await
            .unwrap();

        let filter = QueryFilter {
            language: Some("python".to_string()),
            project: None,
        };
        let hits = index.query(&[1.0, 0.0], 10, &filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "py");

        let hits = index
            .query(&[1.0, 0.0], 1, &QueryFilter::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_equal_distance_ties_break_by_id() {
        let index = MemoryVectorIndex::new();
        index
            .upsert("zeta".into(), vec![1.0, 0.0], metadata("z.rs", None))
            .await
            .unwrap();
        index
            .upsert("alpha".into(), vec![1.0, 0.0], metadata("a.rs", None))
            .await
            .unwrap();

        let hits = index
            .query(&[1.0, 0.0], 2, &QueryFilter::default())
            .await
            .unwrap();
        assert_eq!(hits[0].id, "alpha");
        assert_eq!(hits[1].id, "zeta");
    }

    #[tokio::test]
    async fn test_remove_path() {
        let index = MemoryVectorIndex::new();
        index
            .upsert("a1".into(), vec![1.0], metadata("a.rs", None))
            .await
            .unwrap();
        index
            .upsert("a2".into(), vec![1.0], metadata("a.rs", None))
            .await
            .unwrap();
        index
            .upsert("b1".into(), vec![1.0], metadata("b.rs", None))
            .await
            .unwrap();

        let removed = index.remove_path("a.rs").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let index = MemoryVectorIndex::new();
        index
            .upsert("a".into(), vec![1.0, 2.0], metadata("a.rs", None))
            .await
            .unwrap();

        let result = index
            .upsert("a".into(), vec![1.0, 2.0, 3.0], metadata("a.rs", None))
            .await;
        assert!(matches!(
            result,
            Err(VectorStoreError::DimensionMismatch { .. })
        ));
    }
}
