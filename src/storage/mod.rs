//! Storage module for persisting crawl results
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Dataset records for categories and subcategories
//! - Run tracking with final counts

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteDataset;
pub use traits::{write_export, DatasetSink, StorageError, StorageResult};

use serde::Serialize;

/// Dataset holding the crawled categories
pub const CATEGORIES_DATASET: &str = "categories";

/// Dataset holding the crawled subcategories
pub const SUBCATEGORIES_DATASET: &str = "subcategories";

/// Serializes typed records and appends them to a dataset
///
/// # Arguments
///
/// * `sink` - The dataset sink
/// * `dataset` - Name of the target dataset
/// * `records` - Records to append
///
/// # Returns
///
/// * `Ok(usize)` - Number of records written
/// * `Err(StorageError)` - Serialization or write failure
pub fn append_records<S, T>(sink: &mut S, dataset: &str, records: &[T]) -> StorageResult<usize>
where
    S: DatasetSink + ?Sized,
    T: Serialize,
{
    let values = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    sink.append(dataset, &values)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub counts: RunCounts,
}

/// Final counts stored on a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub categories: usize,
    pub subcategories: usize,
    pub failed_requests: usize,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Category;
    use chrono::Utc;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[RunStatus::Running, RunStatus::Completed, RunStatus::Failed] {
            let db_str = status.to_db_string();
            assert_eq!(Some(*status), RunStatus::from_db_string(db_str));
        }
        assert_eq!(RunStatus::from_db_string("interrupted"), None);
    }

    #[test]
    fn test_append_records_uses_camel_case() {
        let mut sink = SqliteDataset::new_in_memory().unwrap();
        sink.start_run("hash").unwrap();

        let category = Category {
            code: "GI".to_string(),
            name: "Guitars".to_string(),
            url: "https://shop.example/gi.html".to_string(),
            parent_category: None,
            level: 0,
            product_count: Some(12),
            scraped_at: Utc::now(),
            source: "test".to_string(),
        };

        let written = append_records(&mut sink, CATEGORIES_DATASET, &[category]).unwrap();
        assert_eq!(written, 1);

        let records = sink.records(CATEGORIES_DATASET).unwrap();
        assert_eq!(records[0]["productCount"], 12);
        assert!(records[0]["parentCategory"].is_null());
        assert!(records[0].get("scrapedAt").is_some());
    }
}
