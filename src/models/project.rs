//! Project models.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A project grouping tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Project {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Owner's username, denormalized by the serializer
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Project {
    /// Parse the creation timestamp when the server sent one
    pub fn created_at_parsed(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(self.created_at.as_deref()?).ok()
    }
}

/// Fields for creating a project.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewProject {
    pub title: String,
    pub description: String,
}

impl NewProject {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}
