//! Run log persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use treehub_core::config::collections::validate_identifier;
use treehub_core::error::{AppError, ErrorKind};
use treehub_core::result::AppResult;
use treehub_entity::run::{CreateRunLogEntry, RunLogEntry, RunStatus};

/// Destination for per-run execution records.
#[async_trait]
pub trait RunLogStore: Send + Sync + std::fmt::Debug + 'static {
    /// Open a record in `progress` state.
    async fn open(&self, data: &CreateRunLogEntry) -> AppResult<RunLogEntry>;

    /// Close a record with its end time and terminal status.
    async fn close(&self, id: Uuid, end_time: DateTime<Utc>, status: RunStatus) -> AppResult<()>;
}

/// Run log stored in a PostgreSQL table.
#[derive(Debug, Clone)]
pub struct PgRunLog {
    pool: PgPool,
    table: String,
}

impl PgRunLog {
    /// Create a run log over `table`.
    pub fn new(pool: PgPool, table: impl Into<String>) -> AppResult<Self> {
        let table = table.into();
        validate_identifier(&table)?;
        Ok(Self { pool, table })
    }

    /// Most recent entries, newest first.
    pub async fn recent(&self, limit: i64) -> AppResult<Vec<RunLogEntry>> {
        sqlx::query_as::<_, RunLogEntry>(&format!(
            "SELECT * FROM {} ORDER BY start_time DESC LIMIT $1",
            self.table
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list run log", e))
    }
}

#[async_trait]
impl RunLogStore for PgRunLog {
    async fn open(&self, data: &CreateRunLogEntry) -> AppResult<RunLogEntry> {
        sqlx::query_as::<_, RunLogEntry>(&format!(
            "INSERT INTO {} (id, type, text, start_time, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
            self.table
        ))
        .bind(Uuid::now_v7())
        .bind(&data.run_type)
        .bind(&data.text)
        .bind(data.start_time)
        .bind(RunStatus::Progress)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to open run log entry", e))
    }

    async fn close(&self, id: Uuid, end_time: DateTime<Utc>, status: RunStatus) -> AppResult<()> {
        sqlx::query(&format!(
            "UPDATE {} SET end_time = $2, status = $3 WHERE id = $1",
            self.table
        ))
        .bind(id)
        .bind(end_time)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to close run log entry", e))?;
        Ok(())
    }
}

/// Run log kept in memory and echoed to tracing; used by `--no-record` runs and tests.
#[derive(Debug, Default)]
pub struct MemoryRunLog {
    entries: DashMap<Uuid, RunLogEntry>,
}

impl MemoryRunLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry, oldest first.
    pub fn entries(&self) -> Vec<RunLogEntry> {
        let mut all: Vec<RunLogEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|e| e.start_time);
        all
    }
}

#[async_trait]
impl RunLogStore for MemoryRunLog {
    async fn open(&self, data: &CreateRunLogEntry) -> AppResult<RunLogEntry> {
        let entry = RunLogEntry {
            id: Uuid::now_v7(),
            run_type: data.run_type.clone(),
            text: data.text.clone(),
            start_time: data.start_time,
            end_time: None,
            status: RunStatus::Progress,
        };
        info!(run = %entry.run_type, text = %entry.text, "Run started");
        self.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn close(&self, id: Uuid, end_time: DateTime<Utc>, status: RunStatus) -> AppResult<()> {
        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Run log entry {id} not found")))?;
        entry.end_time = Some(end_time);
        entry.status = status;
        info!(run = %entry.run_type, status = %status, "Run finished");
        Ok(())
    }
}
