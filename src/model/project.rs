use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::{Summary, TaskId};

/// Identity of the reserved container that always exists
pub const UNASSIGNED_ID: &str = "unassigned";
/// Display name of the reserved container
pub const UNASSIGNED_NAME: &str = "Unassigned";

/// A named container owning an ordered list of root tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Root tasks, in insertion order. Display order comes from each task's `order`.
    #[serde(default)]
    pub roots: Vec<TaskId>,
    #[serde(default)]
    pub order: i64,
    pub last_edited: DateTime<Utc>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub summaries: Vec<Summary>,
}

impl Project {
    pub fn new(id: String, name: String, order: i64, now: DateTime<Utc>) -> Self {
        Project {
            id,
            name,
            description: None,
            roots: Vec::new(),
            order,
            last_edited: now,
            pinned: false,
            summaries: Vec::new(),
        }
    }

    /// The reserved "Unassigned" container: pinned and ordered last
    pub fn unassigned(now: DateTime<Utc>) -> Self {
        Project {
            pinned: true,
            ..Project::new(
                UNASSIGNED_ID.to_string(),
                UNASSIGNED_NAME.to_string(),
                i64::MAX,
                now,
            )
        }
    }

    pub fn is_unassigned(&self) -> bool {
        self.id == UNASSIGNED_ID
    }
}
