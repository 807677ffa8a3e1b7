//! The task store.
//!
//! `TaskStore` is the only owner of the task collection. Every mutation that
//! changes something is followed by a full snapshot write. Operations never
//! fail: an unknown id is a silent no-op, and a failed write is logged and kept
//! for the surface to show without undoing the in-memory change.

use chrono::Utc;

use crate::celebrate::{Celebration, CelebrationSink};
use crate::error::StoreError;
use crate::storage::{load_tasks, save_tasks, SnapshotStorage};
use crate::task::{new_id, SubTask, Task, TaskDraft};

/// Minimum length of an id prefix accepted by [`TaskStore::resolve`].
const MIN_PREFIX_LEN: usize = 4;

pub struct TaskStore {
    tasks: Vec<Task>,
    storage: Box<dyn SnapshotStorage>,
    sink: Box<dyn CelebrationSink>,
    persist_error: Option<StoreError>,
}

impl TaskStore {
    /// Open a store seeded from whatever the storage currently holds.
    pub fn open(mut storage: Box<dyn SnapshotStorage>, sink: Box<dyn CelebrationSink>) -> Self {
        let tasks = load_tasks(storage.as_mut());
        TaskStore {
            tasks,
            storage,
            sink,
            persist_error: None,
        }
    }

    /// All tasks in storage order (newest first).
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Get a task by id.
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Create a task at the front of the collection and return its id.
    ///
    /// The title is taken as given; rejecting empty titles is the caller's job.
    pub fn create(&mut self, draft: TaskDraft) -> String {
        let mut task = Task::from_draft(draft, Utc::now().timestamp_millis());
        while self.get(&task.id).is_some() {
            task.id = new_id();
        }
        let id = task.id.clone();
        tracing::info!(task_id = %id, "task created");
        self.tasks.insert(0, task);
        self.persist();
        self.sink.celebrate(Celebration::Small);
        id
    }

    /// Flip the completion flag of a task.
    pub fn toggle_completion(&mut self, task_id: &str) {
        let Some(task) = self.get_mut(task_id) else {
            tracing::debug!(task_id, "toggle: no such task");
            return;
        };
        task.completed = !task.completed;
        let completed = task.completed;
        tracing::info!(task_id, completed, "task toggled");
        self.persist();
        if completed {
            self.sink.celebrate(Celebration::Large);
        }
    }

    /// Remove a task together with its subtasks.
    pub fn delete(&mut self, task_id: &str) {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != task_id);
        if self.tasks.len() == before {
            tracing::debug!(task_id, "delete: no such task");
            return;
        }
        tracing::info!(task_id, "task deleted");
        self.persist();
    }

    /// Append one new subtask per title, preserving the given order.
    pub fn append_subtasks<S: AsRef<str>>(&mut self, task_id: &str, titles: &[S]) {
        if titles.is_empty() {
            return;
        }
        let Some(task) = self.get_mut(task_id) else {
            tracing::debug!(task_id, "append subtasks: no such task");
            return;
        };
        for title in titles {
            let mut subtask = SubTask::new(title.as_ref());
            while task.subtasks.iter().any(|s| s.id == subtask.id) {
                subtask.id = new_id();
            }
            task.subtasks.push(subtask);
        }
        tracing::info!(task_id, added = titles.len(), "subtasks appended");
        self.persist();
    }

    /// Flip the completion flag of one subtask.
    pub fn toggle_subtask_completion(&mut self, task_id: &str, subtask_id: &str) {
        let Some(subtask) = self
            .get_mut(task_id)
            .and_then(|t| t.subtasks.iter_mut().find(|s| s.id == subtask_id))
        else {
            tracing::debug!(task_id, subtask_id, "toggle subtask: no such subtask");
            return;
        };
        subtask.completed = !subtask.completed;
        tracing::info!(task_id, subtask_id, completed = subtask.completed, "subtask toggled");
        self.persist();
    }

    /// Resolve user input to a task id: exact id, then a unique id prefix,
    /// then a unique case-insensitive title.
    pub fn resolve(&self, identifier: &str) -> Option<String> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return None;
        }
        if let Some(task) = self.get(identifier) {
            return Some(task.id.clone());
        }
        if identifier.len() >= MIN_PREFIX_LEN {
            let mut matches = self.tasks.iter().filter(|t| t.id.starts_with(identifier));
            if let (Some(task), None) = (matches.next(), matches.next()) {
                return Some(task.id.clone());
            }
        }
        let lower = identifier.to_lowercase();
        let mut matches = self.tasks.iter().filter(|t| t.title.to_lowercase() == lower);
        match (matches.next(), matches.next()) {
            (Some(task), None) => Some(task.id.clone()),
            _ => None,
        }
    }

    /// Resolve user input to a subtask id within a task: exact id, a unique id
    /// prefix, a 1-based position, then a unique case-insensitive title.
    pub fn resolve_subtask(&self, task_id: &str, identifier: &str) -> Option<String> {
        let task = self.get(task_id)?;
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return None;
        }
        if let Some(s) = task.subtasks.iter().find(|s| s.id == identifier) {
            return Some(s.id.clone());
        }
        if identifier.len() >= MIN_PREFIX_LEN {
            let mut matches = task.subtasks.iter().filter(|s| s.id.starts_with(identifier));
            if let (Some(s), None) = (matches.next(), matches.next()) {
                return Some(s.id.clone());
            }
        }
        if let Ok(position) = identifier.parse::<usize>() {
            if let Some(s) = position.checked_sub(1).and_then(|i| task.subtasks.get(i)) {
                return Some(s.id.clone());
            }
        }
        let lower = identifier.to_lowercase();
        let mut matches = task.subtasks.iter().filter(|s| s.title.to_lowercase() == lower);
        match (matches.next(), matches.next()) {
            (Some(s), None) => Some(s.id.clone()),
            _ => None,
        }
    }

    /// Take the most recent persistence failure, if any, for display.
    pub fn take_persist_error(&mut self) -> Option<StoreError> {
        self.persist_error.take()
    }

    fn persist(&mut self) {
        if let Err(e) = save_tasks(self.storage.as_mut(), &self.tasks) {
            tracing::error!(location = %self.storage.describe(), error = %e, "failed to save tasks");
            self.persist_error = Some(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::celebrate::CelebrationQueue;
    use crate::fields::Priority;
    use crate::storage::MemoryStorage;

    fn store() -> (TaskStore, MemoryStorage, CelebrationQueue) {
        let storage = MemoryStorage::new();
        let queue = CelebrationQueue::new();
        let store = TaskStore::open(Box::new(storage.clone()), Box::new(queue.clone()));
        (store, storage, queue)
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            ..Default::default()
        }
    }

    fn stored(storage: &MemoryStorage) -> Vec<Task> {
        serde_json::from_str(&storage.contents().unwrap()).unwrap()
    }

    #[test]
    fn test_create_inserts_at_front() {
        let (mut store, storage, queue) = store();
        let first = store.create(draft("first"));
        let second = store.create(TaskDraft {
            title: "second".into(),
            description: Some("details".into()),
            priority: Priority::High,
            due_date: None,
        });

        assert_eq!(store.len(), 2);
        assert_eq!(store.tasks()[0].id, second);
        assert_eq!(store.tasks()[1].id, first);
        let task = store.get(&second).unwrap();
        assert!(!task.completed);
        assert!(task.subtasks.is_empty());
        assert_eq!(task.priority, Priority::High);
        assert!(task.created_at > 0);
        assert_eq!(queue.drain(), vec![Celebration::Small, Celebration::Small]);
        assert_eq!(stored(&storage), store.tasks());
    }

    #[test]
    fn test_create_does_not_validate_title() {
        let (mut store, _, _) = store();
        store.create(draft(""));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_toggle_is_self_inverse_and_celebrates_once() {
        let (mut store, storage, queue) = store();
        let id = store.create(draft("task"));
        queue.drain();

        store.toggle_completion(&id);
        assert!(store.get(&id).unwrap().completed);
        assert!(stored(&storage)[0].completed);
        store.toggle_completion(&id);
        assert!(!store.get(&id).unwrap().completed);
        assert_eq!(queue.drain(), vec![Celebration::Large]);
    }

    #[test]
    fn test_unknown_ids_are_silent_noops() {
        let (mut store, storage, queue) = store();
        let id = store.create(draft("task"));
        queue.drain();
        let snapshot = storage.contents();

        store.toggle_completion("missing");
        store.delete("missing");
        store.append_subtasks("missing", &["a"]);
        store.toggle_subtask_completion(&id, "missing");
        store.toggle_subtask_completion("missing", "missing");

        assert_eq!(store.len(), 1);
        assert!(store.get(&id).unwrap().subtasks.is_empty());
        assert!(queue.drain().is_empty());
        assert_eq!(storage.contents(), snapshot);
    }

    #[test]
    fn test_delete_removes_subtasks_and_is_idempotent() {
        let (mut store, storage, _) = store();
        let keep = store.create(draft("keep"));
        let id = store.create(draft("doomed"));
        store.append_subtasks(&id, &["a", "b"]);

        store.delete(&id);
        assert_eq!(store.len(), 1);
        assert!(store.get(&id).is_none());
        assert!(store.tasks().iter().all(|t| t.subtasks.is_empty()));
        assert_eq!(stored(&storage).len(), 1);

        store.delete(&id);
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].id, keep);
    }

    #[test]
    fn test_append_subtasks_preserves_order() {
        let (mut store, _, _) = store();
        let id = store.create(draft("task"));
        store.append_subtasks(&id, &["a", "b"]);
        store.append_subtasks(&id, &["c"]);
        store.append_subtasks::<&str>(&id, &[]);

        let titles: Vec<_> = store
            .get(&id)
            .unwrap()
            .subtasks
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(titles, ["a", "b", "c"]);
        let subtasks = &store.get(&id).unwrap().subtasks;
        assert!(subtasks.iter().all(|s| !s.completed));
        assert_ne!(subtasks[0].id, subtasks[1].id);
    }

    #[test]
    fn test_toggle_subtask() {
        let (mut store, storage, queue) = store();
        let id = store.create(draft("task"));
        store.append_subtasks(&id, &["a", "b"]);
        queue.drain();
        let sub = store.get(&id).unwrap().subtasks[1].id.clone();

        store.toggle_subtask_completion(&id, &sub);
        let task = store.get(&id).unwrap();
        assert!(!task.subtasks[0].completed);
        assert!(task.subtasks[1].completed);
        assert!(!task.completed);
        assert!(stored(&storage)[0].subtasks[1].completed);
        assert!(queue.drain().is_empty());

        store.toggle_subtask_completion(&id, &sub);
        assert!(!store.get(&id).unwrap().subtasks[1].completed);
    }

    #[test]
    fn test_reopen_from_existing_snapshot() {
        let (mut store, storage, _) = store();
        let id = store.create(draft("persisted"));
        store.append_subtasks(&id, &["step"]);

        let reopened = TaskStore::open(Box::new(storage.clone()), Box::new(CelebrationQueue::new()));
        assert_eq!(reopened.tasks(), store.tasks());
    }

    #[test]
    fn test_write_failure_keeps_mutation_and_reports() {
        let (mut store, storage, _) = store();
        storage.set_fail_writes(true);
        let id = store.create(draft("unsaved"));
        assert!(store.get(&id).is_some());
        assert!(matches!(store.take_persist_error(), Some(StoreError::Io(_))));
        assert!(store.take_persist_error().is_none());

        storage.set_fail_writes(false);
        store.toggle_completion(&id);
        assert!(store.take_persist_error().is_none());
        assert_eq!(stored(&storage).len(), 1);
    }

    #[test]
    fn test_resolve() {
        let (mut store, _, _) = store();
        let report = store.create(draft("Write Report"));
        let other = store.create(draft("Call Bob"));
        store.create(draft("dup"));
        store.create(draft("DUP"));

        assert_eq!(store.resolve(&report), Some(report.clone()));
        assert_eq!(store.resolve(&report[..8]), Some(report.clone()));
        assert_eq!(store.resolve("write report"), Some(report.clone()));
        assert_eq!(store.resolve("call bob"), Some(other));
        assert_eq!(store.resolve("dup"), None);
        assert_eq!(store.resolve("nothing"), None);
        assert_eq!(store.resolve("  "), None);
    }

    #[test]
    fn test_resolve_subtask() {
        let (mut store, _, _) = store();
        let id = store.create(draft("task"));
        store.append_subtasks(&id, &["outline", "draft", "review"]);
        let subs: Vec<String> = store.get(&id).unwrap().subtasks.iter().map(|s| s.id.clone()).collect();

        assert_eq!(store.resolve_subtask(&id, "2"), Some(subs[1].clone()));
        assert_eq!(store.resolve_subtask(&id, "Review"), Some(subs[2].clone()));
        assert_eq!(store.resolve_subtask(&id, &subs[0]), Some(subs[0].clone()));
        assert_eq!(store.resolve_subtask(&id, "4"), None);
        assert_eq!(store.resolve_subtask(&id, "0"), None);
        assert_eq!(store.resolve_subtask("missing", "1"), None);
    }
}
