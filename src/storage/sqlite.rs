//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the DatasetSink trait.
//! Records are kept per run; exports only ever see the active run.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DatasetSink, StorageError, StorageResult};
use crate::storage::{RunCounts, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::path::Path;

/// SQLite dataset backend
pub struct SqliteDataset {
    conn: Connection,
    run_id: Option<i64>,
}

impl SqliteDataset {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteDataset)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self { conn, run_id: None })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn, run_id: None })
    }

    /// Records a new run and makes it the target of appends and exports
    pub fn start_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        let run_id = self.conn.last_insert_rowid();
        self.run_id = Some(run_id);
        tracing::debug!("Started run {}", run_id);
        Ok(run_id)
    }

    pub fn active_run(&self) -> Option<i64> {
        self.run_id
    }

    /// Stamps the finish time, final status and counts on the active run
    pub fn finish_run(&mut self, status: RunStatus, counts: RunCounts) -> StorageResult<()> {
        let run_id = self.run_id.ok_or(StorageError::NoActiveRun)?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, categories = ?3,
             subcategories = ?4, failed_requests = ?5 WHERE id = ?6",
            params![
                status.to_db_string(),
                now,
                counts.categories as i64,
                counts.subcategories as i64,
                counts.failed_requests as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    pub fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status,
                 categories, subcategories, failed_requests FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    pub fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status,
                 categories, subcategories, failed_requests FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn require_run(&self) -> StorageResult<i64> {
        self.run_id.ok_or(StorageError::NoActiveRun)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        counts: RunCounts {
            categories: row.get::<_, i64>(5)? as usize,
            subcategories: row.get::<_, i64>(6)? as usize,
            failed_requests: row.get::<_, i64>(7)? as usize,
        },
    })
}

impl DatasetSink for SqliteDataset {
    fn append(&mut self, dataset: &str, records: &[Value]) -> StorageResult<usize> {
        let run_id = self.require_run()?;
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO dataset_items (run_id, dataset, payload, stored_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                stmt.execute(params![run_id, dataset, serde_json::to_string(record)?, now])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Appended {} records to {}", records.len(), dataset);
        Ok(records.len())
    }

    fn records(&self, dataset: &str) -> StorageResult<Vec<Value>> {
        let run_id = self.require_run()?;
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM dataset_items WHERE run_id = ?1 AND dataset = ?2 ORDER BY id",
        )?;

        let payloads = stmt
            .query_map(params![run_id, dataset], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|payload| serde_json::from_str(payload).map_err(StorageError::from))
            .collect()
    }

    fn count(&self, dataset: &str) -> StorageResult<u64> {
        let run_id = self.require_run()?;
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM dataset_items WHERE run_id = ?1 AND dataset = ?2",
            params![run_id, dataset],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
