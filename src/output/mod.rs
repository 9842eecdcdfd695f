//! Output module for exports and crawl summaries
//!
//! This module handles:
//! - Rendering dataset records as JSON and CSV
//! - Writing the category tree as JSON and as a markdown outline
//! - Printing the end-of-run summary

mod csv;
mod markdown;
pub mod stats;

pub use csv::render_csv;
pub use markdown::format_tree_markdown;
pub use stats::{print_statistics, RunSummary};

use crate::records::CategoryTree;
use crate::storage::{write_export, StorageResult};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// File name stem of the exported tree
pub const TREE_FILE_STEM: &str = "category-tree";

/// Renders records as a pretty-printed JSON array
pub fn render_json(records: &[Value]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

/// Writes the tree to `<dir>/category-tree.json` and `<dir>/category-tree.md`
///
/// # Arguments
///
/// * `tree` - The assembled category tree
/// * `dir` - Export directory
/// * `site_name` - Used in the markdown heading
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - Paths of the written files
/// * `Err(StorageError)` - Serialization or write failure
pub fn write_tree(tree: &CategoryTree, dir: &Path, site_name: &str) -> StorageResult<Vec<PathBuf>> {
    let json = serde_json::to_string_pretty(tree)?;
    let json_path = write_export(dir, &format!("{}.json", TREE_FILE_STEM), &json)?;

    let markdown = format_tree_markdown(tree, &format!("{} Categories", site_name));
    let md_path = write_export(dir, &format!("{}.md", TREE_FILE_STEM), &markdown)?;

    Ok(vec![json_path, md_path])
}
