//! In-memory vector store with brute-force scoring.
//!
//! Scores every point on every query, fine for tests and small demo
//! collections, not a production index. Cosine similarity for flat
//! vectors, MaxSim for multivectors, matching the comparator semantics
//! the named-vector specs declare.

use super::{
    CollectionInfo, PayloadFilter, PointStruct, ScoredPoint, StoreError, VectorSpec, VectorStore,
};
use crate::embedding::VectorData;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

struct Collection {
    specs: Vec<VectorSpec>,
    points: HashMap<u64, PointStruct>,
}

/// Brute-force in-memory implementation of [`VectorStore`].
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, specs: &[VectorSpec]) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Backend(format!("Lock poisoned: {e}")))?;
        collections.entry(name.to_string()).or_insert_with(|| {
            debug!(collection = name, spaces = specs.len(), "Created collection");
            Collection {
                specs: specs.to_vec(),
                points: HashMap::new(),
            }
        });
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<PointStruct>) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Backend(format!("Lock poisoned: {e}")))?;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        for point in points {
            // Validate against the declared specs before accepting the point.
            for spec in &coll.specs {
                if let Some(vector) = point.vectors.get(&spec.name) {
                    if vector.dim() != spec.dim {
                        return Err(StoreError::DimensionMismatch {
                            vector_name: spec.name.clone(),
                            expected: spec.dim,
                            actual: vector.dim(),
                        });
                    }
                }
            }
            coll.points.insert(point.id, point);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector_name: &str,
        query: &VectorData,
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Backend(format!("Lock poisoned: {e}")))?;
        let coll = collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        if !coll.specs.iter().any(|s| s.name == vector_name) {
            return Err(StoreError::QueryFailed {
                vector_name: vector_name.to_string(),
                reason: "unknown named vector".to_string(),
            });
        }

        let mut hits: Vec<ScoredPoint> = coll
            .points
            .values()
            .filter(|p| filter.map_or(true, |f| f.matches(&p.payload)))
            .filter_map(|p| {
                p.vectors.get(vector_name).map(|stored| ScoredPoint {
                    id: p.id,
                    score: score(query, stored),
                    payload: p.payload.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Backend(format!("Lock poisoned: {e}")))?;
        collections.remove(name);
        Ok(())
    }

    async fn collection_info(&self, name: &str) -> Result<CollectionInfo, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Backend(format!("Lock poisoned: {e}")))?;
        let coll = collections
            .get(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;
        Ok(CollectionInfo {
            vector_count: coll.points.values().map(|p| p.vectors.len()).sum(),
            point_count: coll.points.len(),
        })
    }
}

/// Scores a query against a stored vector.
///
/// Flat vs flat is plain cosine. When either side is a multivector the
/// comparison is MaxSim: for each query row take the best cosine against
/// any stored row, then sum over query rows. A flat side is a one-row
/// multivector under that definition.
fn score(query: &VectorData, stored: &VectorData) -> f32 {
    let query_rows = rows_of(query);
    let stored_rows = rows_of(stored);

    match (query, stored) {
        (VectorData::Flat(q), VectorData::Flat(s)) => cosine(q, s),
        _ => query_rows
            .iter()
            .map(|q| {
                stored_rows
                    .iter()
                    .map(|s| cosine(q, s))
                    .fold(f32::NEG_INFINITY, f32::max)
            })
            .filter(|x| x.is_finite())
            .sum(),
    }
}

fn rows_of(v: &VectorData) -> Vec<&Vec<f32>> {
    match v {
        VectorData::Flat(row) => vec![row],
        VectorData::Multi(rows) => rows.iter().collect(),
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(page: u64) -> super::super::Payload {
        let mut p = serde_json::Map::new();
        p.insert("page_number".to_string(), json!(page));
        p
    }

    fn point(id: u64, vector: Vec<f32>) -> PointStruct {
        let mut vectors = HashMap::new();
        vectors.insert("initial".to_string(), VectorData::Flat(vector));
        PointStruct {
            id,
            vectors,
            payload: payload(id),
        }
    }

    async fn seeded_store() -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new();
        store
            .create_collection("pages", &[VectorSpec::flat("initial", 3)])
            .await
            .unwrap();
        store
            .upsert(
                "pages",
                vec![
                    point(1, vec![1.0, 0.0, 0.0]),
                    point(2, vec![0.0, 1.0, 0.0]),
                    point(3, vec![0.9, 0.1, 0.0]),
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_query_orders_by_descending_score() {
        let store = seeded_store().await;
        let hits = store
            .query(
                "pages",
                "initial",
                &VectorData::Flat(vec![1.0, 0.0, 0.0]),
                10,
                None,
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[1].id, 3);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_query_respects_limit_and_filter() {
        let store = seeded_store().await;
        let hits = store
            .query(
                "pages",
                "initial",
                &VectorData::Flat(vec![1.0, 0.0, 0.0]),
                1,
                None,
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let filtered = store
            .query(
                "pages",
                "initial",
                &VectorData::Flat(vec![1.0, 0.0, 0.0]),
                10,
                Some(&PayloadFilter::field("page_number", 2)),
            )
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 2);
    }

    #[tokio::test]
    async fn test_unknown_vector_name_fails() {
        let store = seeded_store().await;
        let err = store
            .query(
                "pages",
                "mean_pooling",
                &VectorData::Flat(vec![1.0, 0.0, 0.0]),
                10,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::QueryFailed { .. }));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected_on_upsert() {
        let store = seeded_store().await;
        let err = store
            .upsert("pages", vec![point(9, vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_maxsim_prefers_per_row_matches() {
        let store = InMemoryVectorStore::new();
        store
            .create_collection("pages", &[VectorSpec::multi("initial", 2)])
            .await
            .unwrap();

        let mut vectors_a = HashMap::new();
        vectors_a.insert(
            "initial".to_string(),
            VectorData::Multi(vec![vec![1.0, 0.0], vec![0.0, 1.0]]),
        );
        let mut vectors_b = HashMap::new();
        vectors_b.insert(
            "initial".to_string(),
            VectorData::Multi(vec![vec![1.0, 0.0], vec![1.0, 0.0]]),
        );
        store
            .upsert(
                "pages",
                vec![
                    PointStruct {
                        id: 1,
                        vectors: vectors_a,
                        payload: payload(1),
                    },
                    PointStruct {
                        id: 2,
                        vectors: vectors_b,
                        payload: payload(2),
                    },
                ],
            )
            .await
            .unwrap();

        // Query has one row along each axis: point 1 matches both rows
        // perfectly (MaxSim 2.0), point 2 only the first (MaxSim 1.0).
        let query = VectorData::Multi(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let hits = store.query("pages", "initial", &query, 10, None).await.unwrap();
        assert_eq!(hits[0].id, 1);
        assert!((hits[0].score - 2.0).abs() < 1e-5);
        assert!((hits[1].score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_collection_info_counts() {
        let store = seeded_store().await;
        let info = store.collection_info("pages").await.unwrap();
        assert_eq!(info.point_count, 3);
        assert_eq!(info.vector_count, 3);

        store.delete_collection("pages").await.unwrap();
        assert!(matches!(
            store.collection_info("pages").await,
            Err(StoreError::CollectionNotFound(_))
        ));
    }
}
