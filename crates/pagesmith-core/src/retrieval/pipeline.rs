//! The retrieval pipeline: decompose, retrieve per sub-question, and
//! collect the evidence bundle that answer synthesis consumes.

use super::decompose::{decompose_or_whole, QueryDecomposer, SubQuestion};
use super::retriever::{RetrievalError, Retriever};
use crate::config::MAX_CONCURRENT_SUB_QUESTIONS;
use crate::search::FusedResult;
use crate::store::Payload;
use futures::stream::{self, StreamExt};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Evidence retrieved for one sub-question.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    pub sub_question: SubQuestion,
    pub results: Vec<FusedResult>,
}

/// All evidence retrieved for a question, keyed by sub-question in
/// decomposition order.
#[derive(Debug, Clone, Default)]
pub struct RetrievalBundle {
    entries: Vec<BundleEntry>,
}

impl RetrievalBundle {
    pub fn new(entries: Vec<BundleEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// True when no sub-question produced any results.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.results.is_empty())
    }

    pub fn result_count(&self) -> usize {
        self.entries.iter().map(|e| e.results.len()).sum()
    }

    /// Every result across all sub-questions.
    pub fn results(&self) -> impl Iterator<Item = &FusedResult> {
        self.entries.iter().flat_map(|e| e.results.iter())
    }

    /// Distinct page numbers referenced by the evidence, ascending.
    pub fn pages(&self) -> Vec<u64> {
        let mut pages: Vec<u64> = self
            .results()
            .filter_map(|r| page_number(&r.payload))
            .collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    /// Renders the bundle as the plain-text evidence block handed to
    /// answer synthesis.
    pub fn evidence_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "### Sub-question: {}", entry.sub_question.text);
            if entry.results.is_empty() {
                let _ = writeln!(out, "(no relevant pages found)");
            }
            for result in &entry.results {
                let page = page_number(&result.payload)
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let _ = writeln!(out, "\n[Page {page} | score {:.3}]", result.final_score);
                if let Some(section) = result.payload.get("section_title").and_then(|v| v.as_str())
                {
                    let _ = writeln!(out, "Section: {section}");
                }
                if let Some(text) = result.payload.get("embedding_text").and_then(|v| v.as_str())
                {
                    let _ = writeln!(out, "{text}");
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Reads the page number out of a point payload.
///
/// Indexed payloads store it as an integer, but older collections
/// carry it as a string.
pub fn page_number(payload: &Payload) -> Option<u64> {
    match payload.get("page_number")? {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Decompose-then-retrieve pipeline over a single retriever.
pub struct RetrievalPipeline {
    decomposer: Arc<dyn QueryDecomposer>,
    retriever: Arc<dyn Retriever>,
    limit: usize,
}

impl RetrievalPipeline {
    pub fn new(
        decomposer: Arc<dyn QueryDecomposer>,
        retriever: Arc<dyn Retriever>,
        limit: usize,
    ) -> Self {
        Self {
            decomposer,
            retriever,
            limit,
        }
    }

    /// Retrieves evidence for `question`.
    ///
    /// Sub-questions run concurrently with a bounded width. A failing
    /// sub-question is kept as an empty bundle entry as long as at
    /// least one sub-question succeeded; only a total failure is
    /// propagated.
    #[instrument(skip_all, fields(limit = self.limit))]
    pub async fn run(&self, question: &str) -> Result<RetrievalBundle, RetrievalError> {
        let mut sub_questions = decompose_or_whole(self.decomposer.as_ref(), question).await;
        // Sub-question texts key the bundle; keep the first occurrence.
        let mut seen = std::collections::HashSet::new();
        sub_questions.retain(|sq| seen.insert(sq.text.clone()));
        info!(sub_questions = sub_questions.len(), "Retrieving evidence");

        let outcomes: Vec<(SubQuestion, Result<Vec<FusedResult>, RetrievalError>)> =
            stream::iter(sub_questions)
                .map(|sq| {
                    let retriever = Arc::clone(&self.retriever);
                    let limit = self.limit;
                    async move {
                        let outcome = retriever.retrieve(&sq, limit).await;
                        (sq, outcome)
                    }
                })
                .buffered(MAX_CONCURRENT_SUB_QUESTIONS)
                .collect()
                .await;

        let mut entries = Vec::with_capacity(outcomes.len());
        let mut first_error = None;
        let mut successes = 0usize;
        for (sub_question, outcome) in outcomes {
            let results = match outcome {
                Ok(results) => {
                    successes += 1;
                    results
                }
                Err(e) => {
                    warn!(sub_question = %sub_question.text, error = %e, "Sub-question retrieval failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                    Vec::new()
                }
            };
            entries.push(BundleEntry {
                sub_question,
                results,
            });
        }

        if successes == 0 {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let bundle = RetrievalBundle::new(entries);
        debug!(results = bundle.result_count(), "Evidence bundle assembled");
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::VectorKind;
    use crate::error::DecompositionError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn result(id: u64, page: u64, score: f32) -> FusedResult {
        let mut payload = Payload::new();
        payload.insert("page_number".to_string(), serde_json::json!(page));
        payload.insert(
            "embedding_text".to_string(),
            serde_json::json!(format!("content of page {page}")),
        );
        FusedResult {
            id,
            payload,
            scores: HashMap::from([(VectorKind::Initial, score)]),
            vector_count: 1,
            fusion_score: score,
            final_score: score,
            source: None,
        }
    }

    #[test]
    fn test_bundle_pages_are_sorted_and_distinct() {
        let bundle = RetrievalBundle::new(vec![
            BundleEntry {
                sub_question: SubQuestion::new("a"),
                results: vec![result(1, 12, 0.9), result(2, 3, 0.8)],
            },
            BundleEntry {
                sub_question: SubQuestion::new("b"),
                results: vec![result(3, 12, 0.7)],
            },
        ]);
        assert_eq!(bundle.pages(), vec![3, 12]);
        assert_eq!(bundle.result_count(), 3);
        assert!(!bundle.is_empty());
    }

    #[test]
    fn test_bundle_with_only_empty_entries_is_empty() {
        let bundle = RetrievalBundle::new(vec![BundleEntry {
            sub_question: SubQuestion::new("a"),
            results: Vec::new(),
        }]);
        assert!(bundle.is_empty());
        assert!(bundle.evidence_text().contains("no relevant pages"));
    }

    #[test]
    fn test_evidence_text_includes_page_and_content() {
        let bundle = RetrievalBundle::new(vec![BundleEntry {
            sub_question: SubQuestion::new("where is the fuse box?"),
            results: vec![result(1, 44, 0.912)],
        }]);
        let text = bundle.evidence_text();
        assert!(text.contains("### Sub-question: where is the fuse box?"));
        assert!(text.contains("[Page 44 | score 0.912]"));
        assert!(text.contains("content of page 44"));
    }

    struct RepeatingDecomposer;

    #[async_trait]
    impl QueryDecomposer for RepeatingDecomposer {
        async fn decompose(&self, _: &str) -> Result<Vec<SubQuestion>, DecompositionError> {
            Ok(vec![
                SubQuestion::new("fuse rating"),
                SubQuestion::new("fuse rating"),
                SubQuestion::new("fuse location"),
            ])
        }
    }

    struct CountingRetriever;

    #[async_trait]
    impl Retriever for CountingRetriever {
        async fn retrieve(
            &self,
            question: &SubQuestion,
            _limit: usize,
        ) -> Result<Vec<FusedResult>, RetrievalError> {
            let page = if question.text == "fuse rating" { 5 } else { 6 };
            Ok(vec![result(page, page, 0.8)])
        }
    }

    #[tokio::test]
    async fn test_repeated_sub_questions_collapse_to_one_entry() {
        let pipeline = RetrievalPipeline::new(
            Arc::new(RepeatingDecomposer),
            Arc::new(CountingRetriever),
            4,
        );
        let bundle = pipeline.run("what is the fuse rating and location?").await.unwrap();
        let texts: Vec<&str> = bundle
            .entries()
            .iter()
            .map(|e| e.sub_question.text.as_str())
            .collect();
        assert_eq!(texts, vec!["fuse rating", "fuse location"]);
        assert_eq!(bundle.result_count(), 2);
    }

    #[test]
    fn test_page_number_accepts_string_payloads() {
        let mut payload = Payload::new();
        payload.insert("page_number".to_string(), serde_json::json!("17"));
        assert_eq!(page_number(&payload), Some(17));
        payload.insert("page_number".to_string(), serde_json::json!(false));
        assert_eq!(page_number(&payload), None);
    }
}
