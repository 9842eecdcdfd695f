//! Dataset sink trait and error types

use crate::output::{render_csv, render_json};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("No run is active; start a run before appending records")]
    NoActiveRun,
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        StorageError::Serialization(error.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Named, append-only collections of JSON records
///
/// The crawl writes two datasets, `categories` and `subcategories`.
pub trait DatasetSink {
    /// Appends records to a dataset, returning how many were written
    fn append(&mut self, dataset: &str, records: &[Value]) -> StorageResult<usize>;

    /// Every record of a dataset, in append order
    fn records(&self, dataset: &str) -> StorageResult<Vec<Value>>;

    fn count(&self, dataset: &str) -> StorageResult<u64>;

    /// Writes `<dir>/<dataset>.json` as a pretty-printed array
    fn export_json(&self, dataset: &str, dir: &Path) -> StorageResult<PathBuf> {
        let records = self.records(dataset)?;
        write_export(dir, &format!("{}.json", dataset), &render_json(&records)?)
    }

    /// Writes `<dir>/<dataset>.csv` with one column per record field
    fn export_csv(&self, dataset: &str, dir: &Path) -> StorageResult<PathBuf> {
        let records = self.records(dataset)?;
        write_export(dir, &format!("{}.csv", dataset), &render_csv(&records))
    }
}

/// Writes an export file, creating the directory if needed
pub fn write_export(dir: &Path, file_name: &str, contents: &str) -> StorageResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, contents)?;
    tracing::debug!("Wrote {}", path.display());
    Ok(path)
}
