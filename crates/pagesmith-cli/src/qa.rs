//! Engine wiring: load a page metadata file, index it in memory, and
//! answer questions against it.

use crate::embed::HashEmbedder;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use pagesmith_core::config::RetrievalConfig;
use pagesmith_core::embedding::Embedder;
use pagesmith_core::engine::{AnswerSynthesizer, QaEngine, QaResponse};
use pagesmith_core::error::SynthesisError;
use pagesmith_core::indexing::{PageIndexer, PageRecord};
use pagesmith_core::retrieval::{
    page_number, PassthroughDecomposer, RetrievalPipeline, RetrieverFactory, SearchSpace,
};
use pagesmith_core::search::SearchStrategy;
use pagesmith_core::store::{InMemoryVectorStore, Payload, VectorStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Characters of page text quoted per answer line.
const EXCERPT_MAX_LEN: usize = 240;

/// Extractive synthesizer: quotes the best-scoring page per
/// sub-question instead of calling a language model.
pub struct ExtractiveSynthesizer;

#[async_trait]
impl AnswerSynthesizer for ExtractiveSynthesizer {
    async fn synthesize(&self, question: &str, evidence: &str) -> Result<String, SynthesisError> {
        if evidence.trim().is_empty() {
            return Ok(format!(
                "No indexed pages matched \"{question}\". Try rephrasing or re-indexing."
            ));
        }
        let mut answer = String::from("Most relevant manual excerpts:\n");
        let mut remaining = 0usize;
        for line in evidence.lines() {
            if line.starts_with("### Sub-question:") || line.starts_with("[Page ") {
                answer.push_str(line);
                answer.push('\n');
                remaining = EXCERPT_MAX_LEN;
            } else if remaining > 0 && !line.is_empty() {
                let take = line.chars().take(remaining).collect::<String>();
                remaining = remaining.saturating_sub(take.chars().count());
                answer.push_str(&take);
                answer.push('\n');
            }
        }
        Ok(answer)
    }
}

/// Loads page payloads from a JSON array file.
///
/// Each element must carry at least `page_number` and
/// `embedding_text`; the whole object is stored as the point payload.
pub fn load_pages(path: &Path) -> Result<Vec<PageRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pages file: {}", path.display()))?;
    let payloads: Vec<Payload> = serde_json::from_str(&raw)
        .with_context(|| format!("Pages file is not a JSON array of objects: {}", path.display()))?;

    let mut pages = Vec::with_capacity(payloads.len());
    for (i, payload) in payloads.into_iter().enumerate() {
        let text = payload
            .get("embedding_text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("page {} has no embedding_text field", i + 1))?
            .to_string();
        let id = page_number(&payload).unwrap_or(i as u64 + 1);
        pages.push(PageRecord {
            id,
            image: text.into_bytes(),
            payload,
        });
    }
    Ok(pages)
}

/// Indexes `pages` into a fresh in-memory store.
pub async fn build_store(pages: Vec<PageRecord>, collection: &str) -> Result<Arc<InMemoryVectorStore>> {
    let store = Arc::new(InMemoryVectorStore::new());
    let indexer = PageIndexer::new(
        Arc::clone(&store) as Arc<dyn VectorStore>,
        Arc::new(HashEmbedder),
        collection.to_string(),
    );
    indexer.bootstrap().await?;
    let report = indexer.index_pages(pages).await;
    if report.indexed == 0 {
        return Err(anyhow!("no pages could be indexed"));
    }
    if !report.is_clean() {
        info!(
            skipped = report.skipped_pages.len(),
            failed_batches = report.failed_batches.len(),
            "Indexing finished with problems"
        );
    }
    info!(indexed = report.indexed, "Pages indexed");
    Ok(store)
}

/// Builds a question-answer engine over an indexed store.
pub fn build_engine(
    store: Arc<InMemoryVectorStore>,
    strategy: SearchStrategy,
    limit: usize,
    artifacts: Option<PathBuf>,
    collection: &str,
) -> QaEngine {
    let config = RetrievalConfig {
        collection: collection.to_string(),
        sub_question_limit: limit,
        artifact_root: artifacts.unwrap_or_else(|| PathBuf::from("scratch")),
        ..RetrievalConfig::default()
    };
    let factory = RetrieverFactory::new(
        Arc::new(HashEmbedder) as Arc<dyn Embedder>,
        store as Arc<dyn VectorStore>,
        config.clone(),
        strategy,
    );
    let pipeline = RetrievalPipeline::new(
        Arc::new(PassthroughDecomposer),
        factory.retriever(SearchSpace::MultiVector),
        config.sub_question_limit,
    );
    QaEngine::new(pipeline, Arc::new(ExtractiveSynthesizer), config.artifact_root)
}

/// Answers `question` with one strategy.
pub async fn ask(
    question: &str,
    pages_file: &Path,
    strategy: SearchStrategy,
    limit: usize,
    artifacts: Option<PathBuf>,
) -> Result<QaResponse> {
    let pages = load_pages(pages_file)?;
    let store = build_store(pages, "manual_pages").await?;
    let engine = build_engine(store, strategy, limit, artifacts, "manual_pages");
    Ok(engine.ask(question).await?)
}

/// Answers `question` once per strategy, for side-by-side comparison.
pub async fn compare(
    question: &str,
    pages_file: &Path,
    limit: usize,
    artifacts: Option<PathBuf>,
) -> Result<Vec<(SearchStrategy, QaResponse)>> {
    let pages = load_pages(pages_file)?;
    let store = build_store(pages, "manual_pages").await?;

    let mut runs = Vec::with_capacity(SearchStrategy::ALL.len());
    for strategy in SearchStrategy::ALL {
        let engine = build_engine(
            Arc::clone(&store),
            strategy,
            limit,
            artifacts.clone(),
            "manual_pages",
        );
        runs.push((strategy, engine.ask(question).await?));
    }
    Ok(runs)
}
