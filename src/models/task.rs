//! Task models: the tracker's central aggregate.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Workflow state of a task, using the backend's wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum TaskStatus {
    #[serde(rename = "TODO")]
    Todo,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "DONE")]
    Done,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "To Do"),
            TaskStatus::InProgress => write!(f, "In Progress"),
            TaskStatus::Done => write!(f, "Done"),
        }
    }
}

/// A task as returned by the list and detail endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    /// Date-only or full timestamp depending on backend version; see
    /// [`Self::due_date_parsed`]
    #[serde(default)]
    pub due_date: Option<String>,
    /// Assignee's username
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// Denormalized by the serializer so lists render without a second fetch
    #[serde(default)]
    pub project_title: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Task {
    /// Parse the due date, accepting both date-only and RFC 3339 forms
    pub fn due_date_parsed(&self) -> Option<NaiveDate> {
        let raw = self.due_date.as_deref()?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.date_naive());
        }
        let prefix: String = raw.chars().take(10).collect();
        NaiveDate::parse_from_str(&prefix, "%Y-%m-%d").ok()
    }

    /// True when the task is past due and not finished
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.due_date_parsed() {
            Some(due) => self.status != TaskStatus::Done && due < today,
            None => false,
        }
    }
}

/// Fields for creating a task. The server fills ids and audit fields.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub due_date: Option<String>,
    pub assigned_to: Option<String>,
    /// Id of the project the task belongs to
    pub project: i64,
}

impl NewTask {
    /// Start a draft with the minimum required fields
    pub fn new(title: impl Into<String>, project: i64) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Todo,
            due_date: None,
            assigned_to: None,
            project,
        }
    }
}

/// Task export report: the three attention buckets the backend computes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TaskExport {
    /// Tasks due within the next 48 hours
    #[serde(default)]
    pub due_soon: Vec<Task>,
    /// Unfinished tasks past their due date
    #[serde(default)]
    pub overdue: Vec<Task>,
    /// Tasks completed within the last 24 hours
    #[serde(default)]
    pub recently_completed: Vec<Task>,
}
