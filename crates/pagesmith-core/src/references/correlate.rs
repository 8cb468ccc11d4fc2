//! Correlating extracted references with the page artifact tree.
//!
//! The page extractor writes, per page:
//! `page_<n>/tables/<element_id>.png`, `page_<n>/tables/<element_id>.html`
//! and `page_<n>/images/image-<page>-<idx>.png`. Figure metadata labels
//! them `figure-<page>-<idx>`, so figure lookup falls back to the
//! `image-` file name with the same trailing index. A missing artifact
//! leaves the path unset; it is never an error.

use super::types::ReferenceSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fills in artifact paths for every reference that has a file on
/// disk under `root`.
pub fn correlate_artifacts(set: &mut ReferenceSet, root: &Path) {
    for table in &mut set.tables {
        let dir = root
            .join(format!("page_{}", table.page_number))
            .join("tables");
        table.png_file = existing(dir.join(format!("{}.png", table.element_id)));
        table.html_file = existing(dir.join(format!("{}.html", table.element_id)));
        if table.png_file.is_none() && table.html_file.is_none() {
            debug!(element_id = %table.element_id, page = table.page_number, "No table artifact on disk");
        }
    }

    for figure in &mut set.figures {
        let dir = root
            .join(format!("page_{}", figure.page_number))
            .join("images");
        figure.png_file = existing(dir.join(format!("{}.png", figure.label)))
            .or_else(|| {
                trailing_index(&figure.label).and_then(|idx| {
                    existing(dir.join(format!("image-{}-{idx}.png", figure.page_number)))
                })
            });
        if figure.png_file.is_none() {
            debug!(label = %figure.label, page = figure.page_number, "No figure artifact on disk");
        }
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

/// Index suffix of labels of the form `figure-<page>-<idx>`.
fn trailing_index(label: &str) -> Option<u32> {
    label.rsplit('-').next()?.parse().ok()
}
