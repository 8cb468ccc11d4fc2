//! Extracting table and figure references out of evidence payloads.
//!
//! Indexed page payloads carry a `content_elements` array (typed
//! elements with an `element_id`) plus looser auxiliary fields whose
//! values are identifier strings or objects carrying a `label`.
//! Extraction is tolerant: unknown shapes are skipped, never an error.

use super::types::{FigureReference, ReferenceSet, TableReference};
use crate::retrieval::{page_number, RetrievalBundle};
use serde_json::Value;
use tracing::debug;

/// Payload fields scanned in addition to `content_elements`.
const AUXILIARY_FIELDS: [&str; 4] = [
    "flattened_tables",
    "table_metadata",
    "figure_summaries",
    "page_relations",
];

/// Collects every table and figure identifier mentioned by the
/// bundle's evidence, deduplicated by identifier and page.
pub fn extract_references(bundle: &RetrievalBundle) -> ReferenceSet {
    let mut set = ReferenceSet::default();

    for entry in bundle.entries() {
        let sub_question = &entry.sub_question.text;
        for result in &entry.results {
            let Some(page) = page_number(&result.payload) else {
                continue;
            };

            if let Some(Value::Array(elements)) = result.payload.get("content_elements") {
                for element in elements {
                    if let Some(id) = element.get("element_id").and_then(Value::as_str) {
                        let kind = element.get("type").and_then(Value::as_str);
                        classify(&mut set, id, kind, page, sub_question);
                    }
                }
            }

            for field in AUXILIARY_FIELDS {
                let Some(value) = result.payload.get(field) else {
                    continue;
                };
                for id in identifiers_in(value) {
                    classify(&mut set, id, None, page, sub_question);
                }
            }
        }
    }

    set.dedup();
    debug!(
        tables = set.tables.len(),
        figures = set.figures.len(),
        "References extracted"
    );
    set
}

/// Pulls identifier strings out of an auxiliary field value, which may
/// be a plain string, an array of strings, or an array of objects
/// keyed by `element_id` or `label`.
fn identifiers_in(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.as_str()),
                Value::Object(obj) => obj
                    .get("element_id")
                    .or_else(|| obj.get("label"))
                    .and_then(Value::as_str),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn classify(set: &mut ReferenceSet, id: &str, kind: Option<&str>, page: u64, sub_question: &str) {
    // Upstream metadata generators emit the literal "None" for absent
    // identifiers.
    if id.is_empty() || id == "None" {
        return;
    }
    // Typed elements declare their kind; the identifier prefix is the
    // fallback for untyped mentions and unrecognized types.
    let is_table = match kind {
        Some("table") => true,
        Some("figure") | Some("image") => false,
        _ => id.starts_with("table"),
    };
    let is_figure = match kind {
        Some("figure") | Some("image") => true,
        Some("table") => false,
        _ => id.starts_with("figure") || id.starts_with("image"),
    };
    if is_table {
        set.tables.push(TableReference {
            element_id: id.to_string(),
            page_number: page,
            sub_question: sub_question.to_string(),
            png_file: None,
            html_file: None,
        });
    } else if is_figure {
        set.figures.push(FigureReference {
            label: id.to_string(),
            page_number: page,
            sub_question: sub_question.to_string(),
            png_file: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::VectorKind;
    use crate::retrieval::{BundleEntry, SubQuestion};
    use crate::search::FusedResult;
    use crate::store::Payload;
    use std::collections::HashMap;

    fn result_with_payload(payload: Payload) -> FusedResult {
        FusedResult {
            id: 1,
            payload,
            scores: HashMap::from([(VectorKind::Initial, 0.8)]),
            vector_count: 1,
            fusion_score: 0.8,
            final_score: 0.8,
            source: None,
        }
    }

    fn bundle(payload: Payload) -> RetrievalBundle {
        RetrievalBundle::new(vec![BundleEntry {
            sub_question: SubQuestion::new("how tight?"),
            results: vec![result_with_payload(payload)],
        }])
    }

    #[test]
    fn test_extracts_typed_content_elements() {
        let payload: Payload = serde_json::from_value(serde_json::json!({
            "page_number": 36,
            "content_elements": [
                {"type": "table", "element_id": "table-36-1"},
                {"type": "figure", "element_id": "figure-36-1"},
                {"type": "text_block", "element_id": "textblock-36-2"},
            ],
        }))
        .unwrap();
        let set = extract_references(&bundle(payload));
        assert_eq!(set.tables.len(), 1);
        assert_eq!(set.tables[0].element_id, "table-36-1");
        assert_eq!(set.tables[0].sub_question, "how tight?");
        assert_eq!(set.figures.len(), 1);
        assert_eq!(set.figures[0].label, "figure-36-1");
    }

    #[test]
    fn test_element_type_wins_over_off_convention_id() {
        let payload: Payload = serde_json::from_value(serde_json::json!({
            "page_number": 12,
            "content_elements": [
                {"type": "table", "element_id": "torque-specs-overview"},
                {"type": "image", "element_id": "exploded-view-12"},
            ],
        }))
        .unwrap();
        let set = extract_references(&bundle(payload));
        assert_eq!(set.tables.len(), 1);
        assert_eq!(set.tables[0].element_id, "torque-specs-overview");
        assert_eq!(set.figures.len(), 1);
        assert_eq!(set.figures[0].label, "exploded-view-12");
    }

    #[test]
    fn test_auxiliary_fields_and_none_literal() {
        let payload: Payload = serde_json::from_value(serde_json::json!({
            "page_number": 9,
            "flattened_tables": ["table-9-1", "None", ""],
            "figure_summaries": [{"label": "figure-9-2", "summary": "wiring"}],
        }))
        .unwrap();
        let set = extract_references(&bundle(payload));
        assert_eq!(set.tables.len(), 1);
        assert_eq!(set.figures.len(), 1);
    }

    #[test]
    fn test_duplicate_mentions_collapse() {
        let payload: Payload = serde_json::from_value(serde_json::json!({
            "page_number": 5,
            "content_elements": [{"type": "table", "element_id": "table-5-1"}],
            "flattened_tables": ["table-5-1"],
        }))
        .unwrap();
        let set = extract_references(&bundle(payload));
        assert_eq!(set.tables.len(), 1);
    }

    #[test]
    fn test_payload_without_page_number_is_skipped() {
        let payload: Payload = serde_json::from_value(serde_json::json!({
            "content_elements": [{"type": "table", "element_id": "table-1-1"}],
        }))
        .unwrap();
        let set = extract_references(&bundle(payload));
        assert!(set.is_empty());
    }
}
