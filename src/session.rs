use crate::models::{Task, TaskId};
use crate::storage::Backend;
use crate::store::{TaskError, TaskStore};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Idle,
    Editing { id: TaskId, draft: String },
}

/// Tracks the single task being edited inline.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    state: EditState,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn editing(&self) -> Option<TaskId> {
        match &self.state {
            EditState::Editing { id, .. } => Some(*id),
            EditState::Idle => None,
        }
    }

    pub fn draft(&self) -> Option<&str> {
        match &self.state {
            EditState::Editing { draft, .. } => Some(draft.as_str()),
            EditState::Idle => None,
        }
    }

    /// Starts editing `id` with `text` as the initial draft. Any edit already
    /// in progress is cancelled first; its id is returned.
    pub fn start(&mut self, id: TaskId, text: &str) -> Option<TaskId> {
        let cancelled = self.cancel().filter(|previous| *previous != id);
        self.state = EditState::Editing {
            id,
            draft: text.to_string(),
        };
        cancelled
    }

    /// Ignored while idle.
    pub fn set_draft(&mut self, text: &str) {
        if let EditState::Editing { draft, .. } = &mut self.state {
            *draft = text.to_string();
        }
    }

    pub fn cancel(&mut self) -> Option<TaskId> {
        let previous = self.editing();
        self.state = EditState::Idle;
        previous
    }

    /// Saves `text` through the store. On error the session stays open so the
    /// caller can prompt again. Returns `Ok(None)` when nothing is being edited.
    pub fn commit<B: Backend>(
        &mut self,
        store: &mut TaskStore<B>,
        text: &str,
    ) -> Result<Option<Task>, TaskError> {
        let id = match self.editing() {
            Some(id) => id,
            None => return Ok(None),
        };
        match store.edit(id, text) {
            Ok(task) => {
                self.state = EditState::Idle;
                Ok(Some(task))
            }
            Err(TaskError::NotFound(missing)) => {
                self.state = EditState::Idle;
                Err(TaskError::NotFound(missing))
            }
            Err(err) => {
                self.set_draft(text);
                Err(err)
            }
        }
    }

    /// Ends the session if it targets `id`, e.g. after that task was deleted.
    pub fn forget(&mut self, id: TaskId) -> bool {
        if self.editing() == Some(id) {
            self.state = EditState::Idle;
            return true;
        }
        false
    }
}
