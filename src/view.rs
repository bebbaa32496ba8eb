use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Task, TaskId};
use crate::session::EditSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" => Ok(Filter::Completed),
            other => Err(format!("unknown filter: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub completion_rate: u32,
}

/// Tasks matching `filter`, in their stored order.
pub fn filtered(tasks: &[Task], filter: Filter) -> Vec<&Task> {
    tasks.iter().filter(|task| filter.matches(task)).collect()
}

pub fn counters(tasks: &[Task]) -> Counters {
    let total = tasks.len();
    let completed = tasks.iter().filter(|task| task.completed).count();
    let completion_rate = if total > 0 {
        (completed as f64 / total as f64 * 100.0).round() as u32
    } else {
        0
    };
    Counters {
        total,
        completed,
        active: total - completed,
        completion_rate,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRow {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub editing: bool,
    /// Unsaved edit text, only set on the row being edited.
    pub draft: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub filter: Filter,
    pub rows: Vec<TaskRow>,
    pub counters: Counters,
    pub task_label: String,
    pub completed_label: String,
    pub empty: bool,
}

/// Everything a front end needs to draw the list, independent of how it draws.
pub fn build_view(tasks: &[Task], filter: Filter, session: &EditSession) -> ViewModel {
    let editing = session.editing();
    let rows: Vec<TaskRow> = filtered(tasks, filter)
        .into_iter()
        .map(|task| {
            let is_editing = editing == Some(task.id);
            TaskRow {
                id: task.id,
                text: task.text.clone(),
                completed: task.completed,
                editing: is_editing,
                draft: if is_editing {
                    session.draft().map(str::to_string)
                } else {
                    None
                },
            }
        })
        .collect();
    let counters = counters(tasks);
    let plural = if counters.total == 1 { "" } else { "s" };
    ViewModel {
        filter,
        empty: rows.is_empty(),
        rows,
        task_label: format!("{} task{plural}", counters.total),
        completed_label: format!("{} completed", counters.completed),
        counters,
    }
}
