use std::collections::HashSet;

use chrono::Utc;

use crate::models::{ExportFile, StoredTask, Task, TaskId, EXPORT_VERSION, MAX_TASK_ID};
use crate::storage::{Backend, Storage, StorageError};
use crate::view::{counters, Counters};

pub const MAX_TEXT_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    EmptyText,
    TooLong { len: usize },
    NotFound(TaskId),
    IdsExhausted,
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskError::EmptyText => write!(f, "Please enter a task description"),
            TaskError::TooLong { .. } => write!(
                f,
                "Task description must be {MAX_TEXT_LEN} characters or less"
            ),
            TaskError::NotFound(id) => write!(f, "task {id} not found"),
            TaskError::IdsExhausted => write!(f, "No more task ids are available"),
        }
    }
}

impl std::error::Error for TaskError {}

/// Trims `text` and checks it fits in a task.
pub fn validate_text(text: &str) -> Result<&str, TaskError> {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        return Err(TaskError::EmptyText);
    }
    if len > MAX_TEXT_LEN {
        return Err(TaskError::TooLong { len });
    }
    Ok(trimmed)
}

/// The authoritative task list and id counter, written through to storage
/// after every successful mutation.
pub struct TaskStore<B: Backend> {
    tasks: Vec<Task>,
    id_counter: u64,
    storage: Storage<B>,
    persist_error: Option<StorageError>,
}

impl<B: Backend> TaskStore<B> {
    /// Loads persisted state. Missing or unreadable data starts an empty store.
    pub fn open(storage: Storage<B>) -> Self {
        let (tasks, id_counter) = match storage.load() {
            Ok(Some(file)) => normalize(file.tasks, file.task_id_counter),
            Ok(None) => (Vec::new(), 0),
            Err(err) => {
                log::error!("failed to load tasks, starting empty: {err}");
                (Vec::new(), 0)
            }
        };
        log::info!(
            "task store opened tasks={} id_counter={}",
            tasks.len(),
            id_counter
        );
        Self {
            tasks,
            id_counter,
            storage,
            persist_error: None,
        }
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Highest id handed out so far; the next task gets `id_counter + 1`.
    pub fn id_counter(&self) -> u64 {
        self.id_counter
    }

    pub fn create(&mut self, text: &str) -> Result<Task, TaskError> {
        let text = validate_text(text)?;
        let id = match next_id(self.id_counter) {
            Some(id) => id,
            None => {
                log::error!("task id counter exhausted at {}", self.id_counter);
                return Err(TaskError::IdsExhausted);
            }
        };
        self.id_counter = id;
        let task = Task {
            id: TaskId(id),
            text: text.to_string(),
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.tasks.insert(0, task.clone());
        log::debug!("task created id={}", task.id);
        self.persist();
        Ok(task)
    }

    pub fn edit(&mut self, id: TaskId, text: &str) -> Result<Task, TaskError> {
        let text = validate_text(text)?;
        let task = self.find_mut(id)?;
        task.text = text.to_string();
        let task = task.clone();
        log::debug!("task edited id={id}");
        self.persist();
        Ok(task)
    }

    pub fn toggle_completion(&mut self, id: TaskId) -> Result<Task, TaskError> {
        let task = self.find_mut(id)?;
        task.completed = !task.completed;
        task.completed_at = task.completed.then(Utc::now);
        let task = task.clone();
        log::debug!("task toggled id={id} completed={}", task.completed);
        self.persist();
        Ok(task)
    }

    pub fn delete(&mut self, id: TaskId) -> Result<Task, TaskError> {
        let index = match self.tasks.iter().position(|t| t.id == id) {
            Some(index) => index,
            None => return Err(not_found(id)),
        };
        let task = self.tasks.remove(index);
        log::debug!("task deleted id={id}");
        self.persist();
        Ok(task)
    }

    /// Removes every task. The id counter is kept so ids stay unique.
    pub fn clear(&mut self) {
        self.tasks.clear();
        log::info!("all tasks cleared");
        self.persist();
    }

    pub fn export(&self) -> ExportFile {
        ExportFile {
            tasks: self.tasks.iter().cloned().map(StoredTask::from).collect(),
            export_date: Some(Utc::now()),
            version: EXPORT_VERSION.to_string(),
        }
    }

    /// Replaces the task list with imported tasks, normalized the same way as
    /// a load. Returns the number of tasks kept.
    pub fn import(&mut self, data: ExportFile) -> usize {
        let (tasks, id_counter) = normalize(data.tasks, self.id_counter);
        self.tasks = tasks;
        self.id_counter = id_counter;
        log::info!("imported tasks count={}", self.tasks.len());
        self.persist();
        self.tasks.len()
    }

    pub fn statistics(&self) -> Counters {
        counters(&self.tasks)
    }

    /// The error of the most recent failed write, if it has not been taken yet.
    pub fn take_persist_error(&mut self) -> Option<StorageError> {
        self.persist_error.take()
    }

    fn find_mut(&mut self, id: TaskId) -> Result<&mut Task, TaskError> {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => Ok(task),
            None => Err(not_found(id)),
        }
    }

    fn persist(&mut self) {
        match self.storage.save(&self.tasks, self.id_counter) {
            Ok(()) => self.persist_error = None,
            Err(err) => {
                log::error!("failed to save tasks: {err}");
                self.persist_error = Some(err);
            }
        }
    }
}

/// The id after `counter`, or `None` once the id range is used up.
fn next_id(counter: u64) -> Option<u64> {
    counter.checked_add(1).filter(|id| *id <= MAX_TASK_ID)
}

fn not_found(id: TaskId) -> TaskError {
    log::warn!("task {id} not found");
    TaskError::NotFound(id)
}

/// Restores the store invariants on tasks that came from outside: unique
/// positive ids, a counter at least as large as any id, valid text and a
/// `completed_at` that matches `completed`.
fn normalize(stored: Vec<StoredTask>, counter: u64) -> (Vec<Task>, u64) {
    let mut id_counter = stored
        .iter()
        .filter_map(|task| task.id)
        .fold(counter, u64::max);
    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(stored.len());

    for task in stored {
        let text = match validate_text(&task.text) {
            Ok(text) => text.to_string(),
            Err(err) => {
                log::warn!("dropping stored task id={:?}: {err}", task.id);
                continue;
            }
        };
        let id = match task.id {
            Some(id) if seen.insert(id) => id,
            stale => match next_id(id_counter) {
                Some(fresh) => {
                    if let Some(duplicate) = stale {
                        log::warn!("duplicate task id={duplicate} reassigned to {fresh}");
                    }
                    id_counter = fresh;
                    seen.insert(fresh);
                    fresh
                }
                None => {
                    log::warn!("dropping stored task id={stale:?}: no task ids left");
                    continue;
                }
            },
        };
        let completed_at = if task.completed {
            Some(task.completed_at.unwrap_or(task.created_at))
        } else {
            None
        };
        tasks.push(Task {
            id: TaskId(id),
            text,
            completed: task.completed,
            created_at: task.created_at,
            completed_at,
        });
    }

    (tasks, id_counter)
}
