//! Run log entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::RunStatus;

/// One execution record written by the run orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RunLogEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// Job label, e.g. `"5/8 EMPTINESS"`.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub run_type: String,
    /// Human-readable description of the job.
    pub text: String,
    /// When the run started.
    pub start_time: DateTime<Utc>,
    /// When the run finished (unset while in progress).
    pub end_time: Option<DateTime<Utc>>,
    /// Current status.
    pub status: RunStatus,
}

/// Data required to open a run log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRunLogEntry {
    /// Job label.
    pub run_type: String,
    /// Human-readable description.
    pub text: String,
    /// When the run started.
    pub start_time: DateTime<Utc>,
}
