//! Output formatting for answers and strategy comparisons.
//!
//! Supports both human-readable terminal output and JSON for scripting.

use pagesmith_core::engine::QaResponse;
use pagesmith_core::references::ReferenceSet;
use pagesmith_core::search::SearchStrategy;
use serde::Serialize;

/// JSON output structure for a single answer
#[derive(Serialize)]
pub struct JsonAnswer<'a> {
    pub question: &'a str,
    pub answer: &'a str,
    pub pages: Vec<u64>,
    pub references: &'a ReferenceSet,
}

impl<'a> JsonAnswer<'a> {
    pub fn new(question: &'a str, response: &'a QaResponse) -> Self {
        Self {
            question,
            answer: &response.answer,
            pages: response.bundle.pages(),
            references: &response.references,
        }
    }
}

/// Formats one answer as JSON.
pub fn format_json(question: &str, response: &QaResponse) -> String {
    serde_json::to_string_pretty(&JsonAnswer::new(question, response))
        .unwrap_or_else(|_| "{}".to_string())
}

/// Formats one answer for the terminal.
pub fn format_human(question: &str, response: &QaResponse) -> String {
    let mut out = String::new();
    out.push_str(&format!("Question: {question}\n\n"));
    out.push_str(&response.answer);
    out.push('\n');

    let pages = response.bundle.pages();
    if !pages.is_empty() {
        let pages: Vec<String> = pages.iter().map(|p| p.to_string()).collect();
        out.push_str(&format!("\nPages: {}\n", pages.join(", ")));
    }

    let refs = &response.references;
    if !refs.is_empty() {
        out.push_str("\nReferences:\n");
        for table in &refs.tables {
            out.push_str(&format!("  table  {} (page {})", table.element_id, table.page_number));
            if let Some(png) = &table.png_file {
                out.push_str(&format!("  {}", png.display()));
            }
            out.push('\n');
        }
        for figure in &refs.figures {
            out.push_str(&format!("  figure {} (page {})", figure.label, figure.page_number));
            if let Some(png) = &figure.png_file {
                out.push_str(&format!("  {}", png.display()));
            }
            out.push('\n');
        }
    }
    out
}

/// Formats a strategy comparison run for the terminal.
pub fn format_comparison(question: &str, runs: &[(SearchStrategy, QaResponse)]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Question: {question}\n"));
    for (strategy, response) in runs {
        out.push_str(&format!("\n=== {strategy} ===\n"));
        for entry in response.bundle.entries() {
            for (i, result) in entry.results.iter().enumerate() {
                let page = pagesmith_core::retrieval::page_number(&result.payload)
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "?".to_string());
                out.push_str(&format!(
                    "  {}. page {page}  final {:.3}  fused {:.3}  spaces {}\n",
                    i + 1,
                    result.final_score,
                    result.fusion_score,
                    result.vector_count
                ));
            }
        }
        if response.bundle.is_empty() {
            out.push_str("  (no results)\n");
        }
    }
    out
}

/// Formats a strategy comparison run as JSON.
pub fn format_comparison_json(question: &str, runs: &[(SearchStrategy, QaResponse)]) -> String {
    #[derive(Serialize)]
    struct JsonRun<'a> {
        strategy: &'a str,
        #[serde(flatten)]
        answer: JsonAnswer<'a>,
    }

    let runs: Vec<JsonRun> = runs
        .iter()
        .map(|(strategy, response)| JsonRun {
            strategy: strategy.as_str(),
            answer: JsonAnswer::new(question, response),
        })
        .collect();
    serde_json::to_string_pretty(&runs).unwrap_or_else(|_| "[]".to_string())
}
