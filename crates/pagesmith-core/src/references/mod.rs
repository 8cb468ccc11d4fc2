//! Table and figure references: extraction from evidence payloads,
//! correlation with on-disk page artifacts, and deduplication.

mod correlate;
mod extract;
mod types;

pub use correlate::correlate_artifacts;
pub use extract::extract_references;
pub use types::{FigureReference, ReferenceSet, TableReference};

use crate::retrieval::RetrievalBundle;
use std::path::Path;

/// Extracts, correlates, and dedups references in one pass.
pub fn collect_references(bundle: &RetrievalBundle, artifact_root: &Path) -> ReferenceSet {
    let mut set = extract_references(bundle);
    correlate_artifacts(&mut set, artifact_root);
    set
}
