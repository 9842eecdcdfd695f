//! Run summary
//!
//! Counts of what a run produced and how many requests succeeded or failed,
//! printed at the end of every crawl.

use crate::crawler::EngineStats;
use crate::state::CrawlProgress;
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of one crawl run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Option<i64>,
    pub categories: usize,
    pub subcategories: usize,
    pub progress: CrawlProgress,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub requests_retried: usize,
    pub requests_rejected: usize,
    pub tree_nodes: Option<usize>,
    pub duration_seconds: f64,
    pub exported: Vec<PathBuf>,
}

impl RunSummary {
    pub fn record_engine(&mut self, stats: EngineStats) {
        self.requests_succeeded = stats.succeeded;
        self.requests_failed = stats.failed;
        self.requests_retried = stats.retried;
        self.requests_rejected = stats.rejected;
    }

    /// Percentage of finished requests that succeeded
    pub fn success_rate(&self) -> f64 {
        let finished = self.requests_succeeded + self.requests_failed;
        if finished == 0 {
            0.0
        } else {
            (self.requests_succeeded as f64 / finished as f64) * 100.0
        }
    }
}

/// Prints the summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_statistics(summary: &RunSummary) {
    println!("=== Crawl Summary ===\n");

    if let Some(run_id) = summary.run_id {
        println!("Run: {}", run_id);
    }
    println!("Duration: {:.1}s", summary.duration_seconds);
    println!();

    println!("Records:");
    println!("  Categories: {}", summary.categories);
    println!(
        "  Category pages processed: {} / {}",
        summary.progress.processed_categories, summary.progress.total_categories
    );
    println!("  Subcategories: {}", summary.subcategories);
    if let Some(nodes) = summary.tree_nodes {
        println!("  Tree nodes: {}", nodes);
    }
    println!();

    println!("Requests:");
    println!("  Succeeded: {}", summary.requests_succeeded);
    println!("  Failed: {}", summary.requests_failed);
    println!("  Retried: {}", summary.requests_retried);
    if summary.requests_rejected > 0 {
        println!("  Over budget: {}", summary.requests_rejected);
    }
    println!();

    if !summary.progress.failed_requests.is_empty() {
        println!(
            "Failed URLs ({}):",
            summary.progress.failed_requests.len()
        );
        for url in &summary.progress.failed_requests {
            println!("  - {}", url);
        }
        println!();
    }

    if !summary.exported.is_empty() {
        println!("Exported:");
        for path in &summary.exported {
            println!("  {}", path.display());
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} requests)",
        summary.success_rate(),
        summary.requests_succeeded,
        summary.requests_succeeded + summary.requests_failed
    );
}
