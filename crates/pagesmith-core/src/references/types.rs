//! Reference types returned alongside an answer.

use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// A table the evidence mentions, with its exported artifacts when
/// they exist on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReference {
    pub element_id: String,
    pub page_number: u64,
    /// The sub-question whose evidence mentioned this table.
    pub sub_question: String,
    pub png_file: Option<PathBuf>,
    pub html_file: Option<PathBuf>,
}

/// A figure the evidence mentions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureReference {
    pub label: String,
    pub page_number: u64,
    pub sub_question: String,
    pub png_file: Option<PathBuf>,
}

/// All tables and figures referenced by an answer's evidence.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceSet {
    pub tables: Vec<TableReference>,
    pub figures: Vec<FigureReference>,
}

impl ReferenceSet {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.figures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len() + self.figures.len()
    }

    /// Drops duplicate references, keyed by identifier and page.
    ///
    /// The first occurrence wins, so references keep the sub-question
    /// that first surfaced them. Idempotent.
    pub fn dedup(&mut self) {
        let mut seen: HashSet<(String, u64)> = HashSet::new();
        self.tables
            .retain(|t| seen.insert((t.element_id.clone(), t.page_number)));
        seen.clear();
        self.figures
            .retain(|f| seen.insert((f.label.clone(), f.page_number)));
    }
}
