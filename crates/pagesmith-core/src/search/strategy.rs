//! Strategy execution: turning one query embedding into one ranked
//! candidate list via the configured vector spaces.

use super::fusion::{combine_cascade, fusion_rerank};
use super::types::{FusedResult, SearchError, SearchStrategy};
use crate::config::OVERFETCH_FACTOR;
use crate::embedding::{derive_vector, EmbeddingMatrix, VectorKind};
use crate::store::{PayloadFilter, ScoredPoint, StoreError, VectorStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Executes a [`SearchStrategy`] against a collection.
///
/// Multi-space strategies tolerate individual space failures: a failed
/// query is logged and degraded to an empty candidate list as long as
/// at least one space answered. The single-space `best_only` strategy
/// has no such margin and propagates its store error directly.
pub struct StrategyExecutor {
    store: Arc<dyn VectorStore>,
    collection: String,
    score_threshold: f32,
}

impl StrategyExecutor {
    pub fn new(store: Arc<dyn VectorStore>, collection: String, score_threshold: f32) -> Self {
        Self {
            store,
            collection,
            score_threshold,
        }
    }

    /// Runs `strategy` for one query embedding, returning at most
    /// `limit` results ordered by final score.
    #[instrument(skip_all, fields(strategy = %strategy, limit))]
    pub async fn search(
        &self,
        query: &EmbeddingMatrix,
        strategy: SearchStrategy,
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<FusedResult>, SearchError> {
        let started = instant::Instant::now();
        let mut results = match strategy {
            SearchStrategy::BestOnly => self.best_only(query, limit, filter).await?,
            SearchStrategy::Cascade => self.cascade(query, limit, filter).await?,
            SearchStrategy::Parallel => self.parallel(query, limit, filter).await?,
        };
        results.retain(|r| r.final_score >= self.score_threshold);
        debug!(
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Strategy execution complete"
        );
        Ok(results)
    }

    async fn query_space(
        &self,
        kind: VectorKind,
        query: &EmbeddingMatrix,
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        let vector = derive_vector(kind, query).map_err(|e| StoreError::QueryFailed {
            vector_name: kind.as_str().to_string(),
            reason: e.to_string(),
        })?;
        self.store
            .query(&self.collection, kind.as_str(), &vector, limit, filter)
            .await
    }

    async fn best_only(
        &self,
        query: &EmbeddingMatrix,
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<FusedResult>, SearchError> {
        let points = self
            .query_space(VectorKind::Initial, query, limit, filter)
            .await?;
        Ok(points
            .into_iter()
            .map(|p| FusedResult {
                id: p.id,
                payload: p.payload,
                scores: HashMap::from([(VectorKind::Initial, p.score)]),
                vector_count: 1,
                fusion_score: p.score,
                final_score: p.score,
                source: None,
            })
            .collect())
    }

    async fn cascade(
        &self,
        query: &EmbeddingMatrix,
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<FusedResult>, SearchError> {
        let fetch = limit * OVERFETCH_FACTOR;
        let (fast, refined) = futures::join!(
            self.query_space(VectorKind::MaxPooling, query, fetch, filter),
            self.query_space(VectorKind::Initial, query, fetch, filter),
        );

        let mut reasons = Vec::new();
        let fast = degrade(fast, VectorKind::MaxPooling, &mut reasons);
        let refined = degrade(refined, VectorKind::Initial, &mut reasons);
        if reasons.len() == 2 {
            return Err(SearchError::AllQueriesFailed { reasons });
        }

        Ok(combine_cascade(fast, refined, limit))
    }

    async fn parallel(
        &self,
        query: &EmbeddingMatrix,
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<FusedResult>, SearchError> {
        let fetch = limit * OVERFETCH_FACTOR;
        let (initial, max_pooled, mean_pooled) = futures::join!(
            self.query_space(VectorKind::Initial, query, fetch, filter),
            self.query_space(VectorKind::MaxPooling, query, fetch, filter),
            self.query_space(VectorKind::MeanPooling, query, fetch, filter),
        );

        let mut reasons = Vec::new();
        let candidates = vec![
            (
                VectorKind::Initial,
                degrade(initial, VectorKind::Initial, &mut reasons),
            ),
            (
                VectorKind::MaxPooling,
                degrade(max_pooled, VectorKind::MaxPooling, &mut reasons),
            ),
            (
                VectorKind::MeanPooling,
                degrade(mean_pooled, VectorKind::MeanPooling, &mut reasons),
            ),
        ];
        if reasons.len() == 3 {
            return Err(SearchError::AllQueriesFailed { reasons });
        }

        Ok(fusion_rerank(candidates, limit))
    }
}

/// Converts a failed space query into an empty candidate list,
/// recording the failure for the all-failed check.
fn degrade(
    result: Result<Vec<ScoredPoint>, StoreError>,
    kind: VectorKind,
    reasons: &mut Vec<String>,
) -> Vec<ScoredPoint> {
    match result {
        Ok(points) => points,
        Err(e) => {
            warn!(space = kind.as_str(), error = %e, "Vector space query failed, continuing without it");
            reasons.push(format!("{}: {e}", kind.as_str()));
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EMBEDDING_DIM;
    use crate::search::types::ResultSource;
    use crate::store::{InMemoryVectorStore, PointStruct, VectorSpec};
    use crate::embedding::{derive_all, VectorData};

    const COLLECTION: &str = "pages";

    fn specs() -> Vec<VectorSpec> {
        VectorKind::ALL
            .iter()
            .map(|k| VectorSpec::multi(k.as_str(), EMBEDDING_DIM))
            .collect()
    }

    fn unit_matrix(hot: usize, rows: usize) -> EmbeddingMatrix {
        let mut out = Vec::with_capacity(rows);
        for _ in 0..rows {
            let mut row = vec![0.0; EMBEDDING_DIM];
            row[hot] = 1.0;
            out.push(row);
        }
        EmbeddingMatrix::new(out, 0)
    }

    async fn seeded_store() -> Arc<InMemoryVectorStore> {
        let store = Arc::new(InMemoryVectorStore::new());
        store.create_collection(COLLECTION, &specs()).await.unwrap();
        let mut points = Vec::new();
        for (id, hot) in [(1u64, 0usize), (2, 1), (3, 2)] {
            let matrix = unit_matrix(hot, 4);
            let vectors: std::collections::HashMap<String, VectorData> = derive_all(&matrix)
                .unwrap()
                .into_iter()
                .map(|(k, v)| (k.as_str().to_string(), v))
                .collect();
            points.push(PointStruct {
                id,
                vectors,
                payload: crate::store::Payload::new(),
            });
        }
        store.upsert(COLLECTION, points).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_best_only_ranks_matching_page_first() {
        let store = seeded_store().await;
        let executor = StrategyExecutor::new(store, COLLECTION.to_string(), 0.0);
        let results = executor
            .search(&unit_matrix(1, 3), SearchStrategy::BestOnly, 2, None)
            .await
            .unwrap();
        assert_eq!(results[0].id, 2);
        assert_eq!(results[0].vector_count, 1);
    }

    #[tokio::test]
    async fn test_parallel_agreement_across_all_spaces() {
        let store = seeded_store().await;
        let executor = StrategyExecutor::new(store, COLLECTION.to_string(), 0.0);
        let results = executor
            .search(&unit_matrix(0, 3), SearchStrategy::Parallel, 3, None)
            .await
            .unwrap();
        assert_eq!(results[0].id, 1);
        // Every space returns the aligned point, earning the full boost.
        assert_eq!(results[0].vector_count, 3);
        assert!(results[0].final_score > results[0].fusion_score);
    }

    #[tokio::test]
    async fn test_cascade_marks_refined_results() {
        let store = seeded_store().await;
        let executor = StrategyExecutor::new(store, COLLECTION.to_string(), 0.0);
        let results = executor
            .search(&unit_matrix(2, 3), SearchStrategy::Cascade, 3, None)
            .await
            .unwrap();
        assert_eq!(results[0].id, 3);
        assert_eq!(results[0].source, Some(ResultSource::Refined));
    }

    #[tokio::test]
    async fn test_best_only_missing_collection_is_fatal() {
        let store = Arc::new(InMemoryVectorStore::new());
        let executor = StrategyExecutor::new(store, "missing".to_string(), 0.0);
        let err = executor
            .search(&unit_matrix(0, 3), SearchStrategy::BestOnly, 2, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Store(_)));
    }

    #[tokio::test]
    async fn test_parallel_missing_collection_reports_all_failures() {
        let store = Arc::new(InMemoryVectorStore::new());
        let executor = StrategyExecutor::new(store, "missing".to_string(), 0.0);
        let err = executor
            .search(&unit_matrix(0, 3), SearchStrategy::Parallel, 2, None)
            .await
            .unwrap_err();
        match err {
            SearchError::AllQueriesFailed { reasons } => assert_eq!(reasons.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_score_threshold_filters_weak_results() {
        let store = seeded_store().await;
        let executor = StrategyExecutor::new(store, COLLECTION.to_string(), 0.5);
        let results = executor
            .search(&unit_matrix(1, 3), SearchStrategy::Parallel, 3, None)
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.final_score >= 0.5));
        assert!(results.iter().any(|r| r.id == 2));
    }
}
