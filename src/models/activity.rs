//! Activity log model.
//!
//! The audit trail is admin-only server-side; contributors receive an
//! access-denied answer from the listing endpoint.

use serde::{Deserialize, Serialize};

/// One audit entry recording a task mutation's previous values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ActivityLog {
    pub id: i64,
    pub task_title: String,
    #[serde(default)]
    pub previous_assignee: Option<String>,
    /// Raw status string; historical rows may predate the current set
    #[serde(default)]
    pub previous_status: Option<String>,
    #[serde(default)]
    pub previous_due_date: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}
