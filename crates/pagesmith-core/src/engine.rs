//! The question-answer engine: retrieval, reference collection, and
//! answer synthesis behind one `ask` call.

use crate::error::SynthesisError;
use crate::references::{collect_references, ReferenceSet};
use crate::retrieval::{RetrievalBundle, RetrievalError, RetrievalPipeline};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// Turns a question plus rendered evidence into an answer.
///
/// Implementations call a language model; the engine never inspects
/// the answer text.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(&self, question: &str, evidence: &str) -> Result<String, SynthesisError>;
}

/// Errors from a full question-answer cycle.
#[derive(Debug, thiserror::Error)]
pub enum QaError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

/// A complete answer with its supporting material.
#[derive(Debug)]
pub struct QaResponse {
    pub answer: String,
    pub references: ReferenceSet,
    pub bundle: RetrievalBundle,
}

/// End-to-end question answering over an indexed manual.
pub struct QaEngine {
    pipeline: RetrievalPipeline,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    artifact_root: PathBuf,
}

impl QaEngine {
    pub fn new(
        pipeline: RetrievalPipeline,
        synthesizer: Arc<dyn AnswerSynthesizer>,
        artifact_root: PathBuf,
    ) -> Self {
        Self {
            pipeline,
            synthesizer,
            artifact_root,
        }
    }

    /// Answers `question` against the indexed collection.
    ///
    /// An empty evidence bundle is not an error: references come back
    /// empty and the synthesizer decides how to answer without
    /// evidence.
    #[instrument(skip_all)]
    pub async fn ask(&self, question: &str) -> Result<QaResponse, QaError> {
        let bundle = self.pipeline.run(question).await?;
        let references = if bundle.is_empty() {
            ReferenceSet::default()
        } else {
            collect_references(&bundle, &self.artifact_root)
        };

        let answer = self
            .synthesizer
            .synthesize(question, &bundle.evidence_text())
            .await?;

        info!(
            evidence = bundle.result_count(),
            tables = references.tables.len(),
            figures = references.figures.len(),
            "Question answered"
        );
        Ok(QaResponse {
            answer,
            references,
            bundle,
        })
    }
}
