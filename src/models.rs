use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub type Timestamp = DateTime<Utc>;

pub const EXPORT_VERSION: &str = "1.0";

/// Largest id the store hands out or accepts from storage (2^53 - 1, the
/// largest integer a JSON number keeps exactly in a browser).
pub const MAX_TASK_ID: u64 = (1 << 53) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Whole-state snapshot written under the storage key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TasksFile<'a> {
    pub tasks: &'a [Task],
    pub task_id_counter: u64,
}

/// A task as read back from storage, before ids and completion fields are
/// normalized. Ids may be missing or hand-edited into something that is not
/// a positive integer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTask {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<u64>,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: Timestamp,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
}

impl From<Task> for StoredTask {
    fn from(task: Task) -> Self {
        Self {
            id: Some(task.id.0),
            text: task.text,
            completed: task.completed,
            created_at: task.created_at,
            completed_at: task.completed_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTasksFile {
    #[serde(default)]
    pub tasks: Vec<StoredTask>,
    #[serde(default, deserialize_with = "lenient_counter")]
    pub task_id_counter: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub tasks: Vec<StoredTask>,
    #[serde(default)]
    pub export_date: Option<Timestamp>,
    #[serde(default)]
    pub version: String,
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .filter(|id| (1..=MAX_TASK_ID).contains(id)))
}

fn lenient_counter<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .filter(|counter| *counter <= MAX_TASK_ID)
        .unwrap_or(0))
}
