//! Question-level retrieval: decomposition, per-sub-question search,
//! and evidence bundling.
//!
//! The flow is `RetrievalPipeline::run` -> [`QueryDecomposer`] ->
//! one [`Retriever`] call per sub-question -> [`RetrievalBundle`].

mod decompose;
mod pipeline;
mod retriever;

pub use decompose::{decompose_or_whole, PassthroughDecomposer, QueryDecomposer, SubQuestion};
pub use pipeline::{page_number, BundleEntry, RetrievalBundle, RetrievalPipeline};
pub use retriever::{
    LateInteractionRetriever, MultiVectorRetriever, RetrievalError, Retriever, RetrieverFactory,
    SearchSpace,
};
