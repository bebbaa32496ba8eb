use chrono::Utc;
use serde::Serialize;

use crate::config::Config;
use crate::models::{ExportFile, Task, TaskId, Timestamp};
use crate::notice::{Notice, NoticeKind, Notices};
use crate::session::EditSession;
use crate::storage::{Backend, Storage};
use crate::store::{TaskError, TaskStore};
use crate::view::{build_view, Counters, Filter, ViewModel};

pub const SAVE_FAILED_MESSAGE: &str = "Failed to save tasks. Your changes may not persist.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    #[serde(flatten)]
    pub view: ViewModel,
    pub pending_delete: Option<TaskId>,
    pub notices: Vec<Notice>,
}

/// What a front end holds: the store plus the UI-side state around it
/// (filter, inline edit, delete confirmation, notices).
pub struct TaskManager<B: Backend> {
    store: TaskStore<B>,
    filter: Filter,
    session: EditSession,
    pending_delete: Option<TaskId>,
    notices: Notices,
}

impl<B: Backend> TaskManager<B> {
    pub fn open(storage: Storage<B>, config: &Config) -> Self {
        Self {
            store: TaskStore::open(storage),
            filter: Filter::default(),
            session: EditSession::new(),
            pending_delete: None,
            notices: Notices::new(config.notice_ttl),
        }
    }

    pub fn store(&self) -> &TaskStore<B> {
        &self.store
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn pending_delete(&self) -> Option<TaskId> {
        self.pending_delete
    }

    pub fn add_task(&mut self, text: &str) -> Result<Task, TaskError> {
        let result = self.store.create(text);
        self.settle(result)
    }

    pub fn toggle_task(&mut self, id: TaskId) -> Result<Task, TaskError> {
        let result = self.store.toggle_completion(id);
        self.settle(result)
    }

    /// Opens `id` for inline editing, cancelling any other edit.
    pub fn start_edit(&mut self, id: TaskId) -> Result<(), TaskError> {
        let text = match self.store.get(id) {
            Some(task) => task.text.clone(),
            None => {
                log::warn!("cannot edit missing task {id}");
                return Err(TaskError::NotFound(id));
            }
        };
        if let Some(cancelled) = self.session.start(id, &text) {
            log::debug!("edit of task {cancelled} cancelled by edit of {id}");
        }
        self.notices.dismiss_all();
        Ok(())
    }

    pub fn update_draft(&mut self, text: &str) {
        self.session.set_draft(text);
    }

    /// Commits the current draft. `Ok(None)` when no edit is open.
    pub fn save_edit(&mut self) -> Result<Option<Task>, TaskError> {
        let draft = match self.session.draft() {
            Some(draft) => draft.to_string(),
            None => return Ok(None),
        };
        let result = self.session.commit(&mut self.store, &draft);
        match result {
            Ok(Some(task)) => {
                self.notices.dismiss_all();
                self.settle(Ok(task)).map(Some)
            }
            Ok(None) => Ok(None),
            Err(err) => self.settle(Err(err)),
        }
    }

    pub fn cancel_edit(&mut self) {
        self.session.cancel();
        self.notices.dismiss_all();
    }

    /// Marks `id` as awaiting delete confirmation.
    pub fn request_delete(&mut self, id: TaskId) -> Result<(), TaskError> {
        if self.store.get(id).is_none() {
            log::warn!("cannot delete missing task {id}");
            return Err(TaskError::NotFound(id));
        }
        self.pending_delete = Some(id);
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Deletes the task awaiting confirmation, if any.
    pub fn confirm_delete(&mut self) -> Result<Option<Task>, TaskError> {
        match self.pending_delete.take() {
            Some(id) => self.delete_task(id).map(Some),
            None => Ok(None),
        }
    }

    /// Deletes without confirmation and ends an edit of the same task.
    pub fn delete_task(&mut self, id: TaskId) -> Result<Task, TaskError> {
        let result = self.store.delete(id);
        if result.is_ok() && self.session.forget(id) {
            log::debug!("edit of task {id} ended by delete");
        }
        if self.pending_delete == Some(id) {
            self.pending_delete = None;
        }
        self.settle(result)
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn clear_all(&mut self) {
        self.store.clear();
        self.session.cancel();
        self.pending_delete = None;
        self.raise_persist_warning();
    }

    pub fn export(&self) -> ExportFile {
        self.store.export()
    }

    pub fn import(&mut self, data: ExportFile) -> usize {
        let count = self.store.import(data);
        self.session.cancel();
        self.pending_delete = None;
        self.raise_persist_warning();
        count
    }

    pub fn statistics(&self) -> Counters {
        self.store.statistics()
    }

    pub fn view(&self, now: Timestamp) -> Screen {
        Screen {
            view: build_view(self.store.all(), self.filter, &self.session),
            pending_delete: self.pending_delete,
            notices: self.notices.active(now),
        }
    }

    /// Turns an operation outcome into notices: validation errors are shown
    /// to the user, missing tasks are only logged, and a failed write adds a
    /// warning on top of a successful result.
    fn settle<T>(&mut self, result: Result<T, TaskError>) -> Result<T, TaskError> {
        match &result {
            Ok(_) => self.raise_persist_warning(),
            Err(TaskError::NotFound(_)) => {}
            Err(err) => self
                .notices
                .push(NoticeKind::Error, err.to_string(), Utc::now()),
        }
        result
    }

    fn raise_persist_warning(&mut self) {
        if self.store.take_persist_error().is_some() {
            self.notices
                .push(NoticeKind::Warning, SAVE_FAILED_MESSAGE, Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileBackend, MemoryBackend};
    use chrono::Duration;

    fn make_manager() -> (TaskManager<MemoryBackend>, MemoryBackend) {
        let backend = MemoryBackend::new();
        let manager = TaskManager::open(Storage::new(backend.clone()), &Config::default());
        (manager, backend)
    }

    #[test]
    fn add_to_empty_store_updates_counters() {
        let (mut manager, _backend) = make_manager();
        manager.add_task("Buy milk").unwrap();
        assert_eq!(
            manager.statistics(),
            Counters {
                total: 1,
                completed: 0,
                active: 1,
                completion_rate: 0
            }
        );
        let screen = manager.view(Utc::now());
        assert_eq!(screen.view.rows.len(), 1);
        assert!(screen.notices.is_empty());
    }

    #[test]
    fn validation_error_raises_notice_without_mutation() {
        let (mut manager, backend) = make_manager();
        assert_eq!(manager.add_task("   "), Err(TaskError::EmptyText));
        assert_eq!(manager.store().all().len(), 0);
        assert_eq!(manager.store().id_counter(), 0);
        assert_eq!(backend.writes(), 0);

        let notices = manager.view(Utc::now()).notices;
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Error);
        assert_eq!(notices[0].message, "Please enter a task description");
        assert!(manager
            .view(Utc::now() + Duration::seconds(6))
            .notices
            .is_empty());
    }

    #[test]
    fn failed_save_warns_but_keeps_state() {
        let (mut manager, backend) = make_manager();
        backend.set_fail_writes(true);
        let task = manager.add_task("offline").unwrap();
        let screen = manager.view(Utc::now());
        assert_eq!(screen.view.rows[0].id, task.id);
        assert_eq!(screen.notices.len(), 1);
        assert_eq!(screen.notices[0].kind, NoticeKind::Warning);
        assert_eq!(screen.notices[0].message, SAVE_FAILED_MESSAGE);
    }

    #[test]
    fn not_found_is_a_quiet_no_op() {
        let (mut manager, backend) = make_manager();
        assert_eq!(
            manager.toggle_task(TaskId(3)),
            Err(TaskError::NotFound(TaskId(3)))
        );
        assert!(manager.start_edit(TaskId(3)).is_err());
        assert!(manager.request_delete(TaskId(3)).is_err());
        assert!(manager.view(Utc::now()).notices.is_empty());
        assert_eq!(backend.writes(), 0);
    }

    #[test]
    fn switching_edits_keeps_first_task_text() {
        let (mut manager, _backend) = make_manager();
        let first = manager.add_task("first").unwrap();
        let second = manager.add_task("second").unwrap();

        manager.start_edit(first.id).unwrap();
        manager.update_draft("never saved");
        manager.start_edit(second.id).unwrap();

        assert_eq!(manager.session().editing(), Some(second.id));
        assert_eq!(manager.store().get(first.id).unwrap().text, "first");
        let rows = manager.view(Utc::now()).view.rows;
        let editing: Vec<_> = rows.iter().filter(|r| r.editing).map(|r| r.id).collect();
        assert_eq!(editing, vec![second.id]);
    }

    #[test]
    fn save_edit_commits_draft_or_stays_open() {
        let (mut manager, _backend) = make_manager();
        let task = manager.add_task("draft me").unwrap();
        assert_eq!(manager.save_edit(), Ok(None));

        manager.start_edit(task.id).unwrap();
        manager.update_draft(&"z".repeat(250));
        assert_eq!(manager.save_edit(), Err(TaskError::TooLong { len: 250 }));
        assert_eq!(manager.session().editing(), Some(task.id));
        assert_eq!(manager.view(Utc::now()).notices.len(), 1);

        manager.update_draft("done drafting");
        let saved = manager.save_edit().unwrap().unwrap();
        assert_eq!(saved.text, "done drafting");
        assert_eq!(manager.session().editing(), None);
        assert!(manager.view(Utc::now()).notices.is_empty());
    }

    #[test]
    fn cancel_edit_discards_draft() {
        let (mut manager, _backend) = make_manager();
        let task = manager.add_task("keep").unwrap();
        manager.start_edit(task.id).unwrap();
        manager.update_draft("discard");
        manager.cancel_edit();
        assert_eq!(manager.session().editing(), None);
        assert_eq!(manager.store().get(task.id).unwrap().text, "keep");
    }

    #[test]
    fn delete_requires_confirmation_and_ends_edit() {
        let (mut manager, backend) = make_manager();
        let task = manager.add_task("remove me").unwrap();
        manager.start_edit(task.id).unwrap();

        manager.request_delete(task.id).unwrap();
        assert_eq!(manager.view(Utc::now()).pending_delete, Some(task.id));
        manager.cancel_delete();
        assert_eq!(manager.confirm_delete(), Ok(None));
        assert_eq!(manager.store().all().len(), 1);

        manager.request_delete(task.id).unwrap();
        let removed = manager.confirm_delete().unwrap().unwrap();
        assert_eq!(removed.id, task.id);
        assert!(manager.store().all().is_empty());
        assert_eq!(manager.session().editing(), None);
        assert_eq!(manager.pending_delete(), None);
        assert_eq!(backend.writes(), 2);
    }

    #[test]
    fn deleting_another_task_keeps_edit_open() {
        let (mut manager, _backend) = make_manager();
        let a = manager.add_task("a").unwrap();
        let b = manager.add_task("b").unwrap();
        manager.start_edit(a.id).unwrap();
        manager.delete_task(b.id).unwrap();
        assert_eq!(manager.session().editing(), Some(a.id));
    }

    #[test]
    fn filter_changes_visible_rows_only() {
        let (mut manager, _backend) = make_manager();
        let a = manager.add_task("a").unwrap();
        manager.add_task("b").unwrap();
        let c = manager.add_task("c").unwrap();
        manager.toggle_task(a.id).unwrap();
        manager.toggle_task(c.id).unwrap();

        manager.set_filter(Filter::Completed);
        let screen = manager.view(Utc::now());
        assert_eq!(screen.view.filter, Filter::Completed);
        let ids: Vec<_> = screen.view.rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![c.id, a.id]);
        assert_eq!(screen.view.counters.completion_rate, 67);
        assert_eq!(manager.filter(), Filter::Completed);
    }

    #[test]
    fn clear_and_import_reset_ui_state() {
        let (mut manager, _backend) = make_manager();
        let a = manager.add_task("a").unwrap();
        manager.start_edit(a.id).unwrap();
        manager.request_delete(a.id).unwrap();
        let export = manager.export();

        manager.clear_all();
        assert!(manager.store().all().is_empty());
        assert_eq!(manager.session().editing(), None);
        assert_eq!(manager.pending_delete(), None);

        assert_eq!(manager.import(export), 1);
        assert_eq!(manager.store().get(a.id).unwrap().text, "a");
    }

    #[test]
    fn state_survives_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let open = || {
            TaskManager::open(
                Storage::new(FileBackend::new(config.data_dir.clone())),
                &config,
            )
        };

        let mut manager = open();
        let task = manager.add_task("persisted").unwrap();
        manager.toggle_task(task.id).unwrap();

        let reopened = open();
        assert_eq!(reopened.store().all(), manager.store().all());
        assert_eq!(reopened.store().id_counter(), 1);
    }
}
