//! Score fusion: merging candidate lists from multiple vector spaces
//! into a single ranking.
//!
//! Two mergers live here. [`combine_cascade`] handles the two-pass
//! cascade (boosted refined entries shadow fast entries for the same
//! point). [`fusion_rerank`] handles the parallel strategy: a weighted
//! mean of per-space scores with a multiplicative agreement boost for
//! points found by more than one space.

use super::types::{FusedResult, ResultSource};
use crate::config::{
    AGREEMENT_BOOST_STEP, CASCADE_FAST_BOOST, CASCADE_REFINED_BOOST, FUSION_WEIGHT_INITIAL,
    FUSION_WEIGHT_MAX_POOLING, FUSION_WEIGHT_MEAN_POOLING,
};
use crate::embedding::VectorKind;
use crate::store::ScoredPoint;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Weight a vector space's raw scores carry in the fused mean.
pub fn fusion_weight(kind: VectorKind) -> f32 {
    match kind {
        VectorKind::Initial => FUSION_WEIGHT_INITIAL,
        VectorKind::MaxPooling => FUSION_WEIGHT_MAX_POOLING,
        VectorKind::MeanPooling => FUSION_WEIGHT_MEAN_POOLING,
    }
}

/// Merges the cascade's fast (pooled) and refined (full) passes.
///
/// Refined scores are multiplied by [`CASCADE_REFINED_BOOST`], fast
/// scores by [`CASCADE_FAST_BOOST`]. A point found by both passes
/// keeps only its refined entry; the boost is applied exactly once.
/// Results are ordered by boosted score, truncated to `limit`; at
/// equal boosted score refined entries rank ahead of fast ones.
pub fn combine_cascade(
    fast: Vec<ScoredPoint>,
    refined: Vec<ScoredPoint>,
    limit: usize,
) -> Vec<FusedResult> {
    let mut results: Vec<FusedResult> = Vec::with_capacity(refined.len() + fast.len());
    let mut seen: HashSet<u64> = HashSet::new();

    for point in refined {
        let boosted = point.score * CASCADE_REFINED_BOOST;
        seen.insert(point.id);
        results.push(FusedResult {
            id: point.id,
            payload: point.payload,
            scores: HashMap::from([(VectorKind::Initial, point.score)]),
            vector_count: 1,
            fusion_score: boosted,
            final_score: boosted,
            source: Some(ResultSource::Refined),
        });
    }

    // Refined entries shadow fast entries for the same point.
    for point in fast {
        if !seen.insert(point.id) {
            continue;
        }
        let boosted = point.score * CASCADE_FAST_BOOST;
        results.push(FusedResult {
            id: point.id,
            payload: point.payload,
            scores: HashMap::from([(VectorKind::MaxPooling, point.score)]),
            vector_count: 1,
            fusion_score: boosted,
            final_score: boosted,
            source: Some(ResultSource::Fast),
        });
    }

    // Stable sort keeps refined ahead of fast on ties.
    results.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    results.truncate(limit);
    debug!(results = results.len(), "Cascade merge complete");
    results
}

/// Rank-fuses candidate lists from every vector space.
///
/// Per point: `fusion_score` is the weighted mean of the raw scores
/// from the spaces that returned it, and
/// `final_score = fusion_score * (1 + (vector_count - 1) * AGREEMENT_BOOST_STEP)`.
/// Results are ordered by `final_score`, truncated to `limit`.
pub fn fusion_rerank(
    candidates: Vec<(VectorKind, Vec<ScoredPoint>)>,
    limit: usize,
) -> Vec<FusedResult> {
    struct Accum {
        payload: crate::store::Payload,
        scores: HashMap<VectorKind, f32>,
    }

    let mut by_id: HashMap<u64, Accum> = HashMap::new();
    for (kind, points) in candidates {
        for point in points {
            let entry = by_id.entry(point.id).or_insert(Accum {
                payload: point.payload,
                scores: HashMap::new(),
            });
            entry.scores.insert(kind, point.score);
        }
    }

    let mut results: Vec<FusedResult> = by_id
        .into_iter()
        .map(|(id, accum)| {
            let mut weighted_sum = 0.0;
            let mut weight_total = 0.0;
            for (kind, score) in &accum.scores {
                let weight = fusion_weight(*kind);
                weighted_sum += score * weight;
                weight_total += weight;
            }
            let vector_count = accum.scores.len();
            let fusion_score = weighted_sum / weight_total;
            let agreement_boost = 1.0 + (vector_count as f32 - 1.0) * AGREEMENT_BOOST_STEP;
            FusedResult {
                id,
                payload: accum.payload,
                scores: accum.scores,
                vector_count,
                fusion_score,
                final_score: fusion_score * agreement_boost,
                source: None,
            }
        })
        .collect();

    results.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    results.truncate(limit);
    debug!(results = results.len(), "Fusion rerank complete");
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Payload;

    fn point(id: u64, score: f32) -> ScoredPoint {
        ScoredPoint {
            id,
            score,
            payload: Payload::new(),
        }
    }

    #[test]
    fn test_cascade_refined_entry_shadows_fast() {
        // Refined wins even when the fast pass scored the point higher.
        let results = combine_cascade(vec![point(1, 0.9)], vec![point(1, 0.5)], 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, Some(ResultSource::Refined));
        assert!((results[0].final_score - 0.6).abs() < 1e-6);
        // Boost applied once, not compounded across passes.
        assert_eq!(results[0].scores[&VectorKind::Initial], 0.5);
    }

    #[test]
    fn test_cascade_boost_reorders_equal_raw_scores() {
        let results = combine_cascade(vec![point(1, 0.55)], vec![point(2, 0.5)], 10);
        assert_eq!(results[0].id, 2);
        assert_eq!(results[1].id, 1);
        assert_eq!(results[1].source, Some(ResultSource::Fast));
    }

    #[test]
    fn test_cascade_ties_rank_refined_before_fast() {
        // A fast 0.6 and a refined 0.5 both land at 0.6 after boosting.
        for offset in 0..40 {
            let fast_id = offset;
            let refined_id = offset + 100;
            let results =
                combine_cascade(vec![point(fast_id, 0.6)], vec![point(refined_id, 0.5)], 10);
            assert_eq!(results[0].id, refined_id, "tie broke toward fast entry");
            assert_eq!(results[0].source, Some(ResultSource::Refined));
            assert_eq!(results[1].id, fast_id);
        }
    }

    #[test]
    fn test_cascade_truncates_to_limit() {
        let fast = (0..8).map(|i| point(i, 0.1 * i as f32)).collect();
        let results = combine_cascade(fast, vec![], 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, 7);
    }

    #[test]
    fn test_fusion_weighted_mean_and_agreement_boost() {
        let candidates = vec![
            (VectorKind::Initial, vec![point(42, 0.8)]),
            (VectorKind::MaxPooling, vec![point(42, 0.6)]),
        ];
        let results = fusion_rerank(candidates, 10);
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.vector_count, 2);
        // (0.8 * 1.0 + 0.6 * 0.8) / 1.8
        assert!((r.fusion_score - 0.711_111).abs() < 1e-4);
        assert!((r.final_score - 0.711_111 * 1.1).abs() < 1e-4);
    }

    #[test]
    fn test_fusion_single_space_has_no_boost() {
        let candidates = vec![(VectorKind::MeanPooling, vec![point(7, 0.9)])];
        let results = fusion_rerank(candidates, 10);
        assert_eq!(results[0].vector_count, 1);
        assert!((results[0].fusion_score - 0.9).abs() < 1e-6);
        assert!((results[0].final_score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_fusion_agreement_outranks_lone_high_score() {
        let candidates = vec![
            (VectorKind::Initial, vec![point(1, 0.7), point(2, 0.72)]),
            (VectorKind::MaxPooling, vec![point(1, 0.7)]),
            (VectorKind::MeanPooling, vec![point(1, 0.7)]),
        ];
        let results = fusion_rerank(candidates, 10);
        // 0.7 * 1.2 = 0.84 beats 0.72 unboosted.
        assert_eq!(results[0].id, 1);
        assert_eq!(results[0].vector_count, 3);
    }

    #[test]
    fn test_fusion_empty_candidates_yield_empty_ranking() {
        let results = fusion_rerank(vec![(VectorKind::Initial, vec![])], 5);
        assert!(results.is_empty());
    }
}
