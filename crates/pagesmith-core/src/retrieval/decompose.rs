//! Query decomposition: splitting a compound question into the
//! sub-questions that are retrieved independently.

use crate::error::DecompositionError;
use async_trait::async_trait;
use tracing::warn;

/// One retrievable sub-question of a user question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubQuestion {
    pub text: String,
}

impl SubQuestion {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Splits a compound question into independently retrievable parts.
///
/// Implementations typically call a language model; tests and simple
/// deployments use [`PassthroughDecomposer`].
#[async_trait]
pub trait QueryDecomposer: Send + Sync {
    async fn decompose(&self, question: &str) -> Result<Vec<SubQuestion>, DecompositionError>;
}

/// Decomposer that returns the question unchanged as its only part.
pub struct PassthroughDecomposer;

#[async_trait]
impl QueryDecomposer for PassthroughDecomposer {
    async fn decompose(&self, question: &str) -> Result<Vec<SubQuestion>, DecompositionError> {
        Ok(vec![SubQuestion::new(question)])
    }
}

/// Decomposes `question`, falling back to the whole question as a
/// single sub-question on failure or an empty decomposition.
pub async fn decompose_or_whole(
    decomposer: &dyn QueryDecomposer,
    question: &str,
) -> Vec<SubQuestion> {
    match decomposer.decompose(question).await {
        Ok(parts) if !parts.is_empty() => parts,
        Ok(_) => {
            warn!("Decomposition returned no sub-questions, retrieving whole question");
            vec![SubQuestion::new(question)]
        }
        Err(e) => {
            warn!(error = %e, "Decomposition failed, retrieving whole question");
            vec![SubQuestion::new(question)]
        }
    }
}
