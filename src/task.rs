//! Task data structures.
//!
//! This module defines the `Task` and `SubTask` records held by the store and
//! the `TaskDraft` that carries the fields a caller supplies when creating one.
//! The serialized field names are the ones used by the persisted snapshot.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates::due_format;
use crate::fields::Priority;

/// A unit of work with priority, optional due date and ordered subtasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "due_format")]
    pub due_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub subtasks: Vec<SubTask>,
    /// Milliseconds since the Unix epoch. Only used to order equal-priority tasks.
    #[serde(default)]
    pub created_at: i64,
}

/// A smaller step belonging to exactly one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// The caller-supplied fields of a task about to be created.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<NaiveDateTime>,
}

/// Generate a fresh opaque identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Task {
    /// Build a complete task from a draft.
    pub fn from_draft(draft: TaskDraft, created_at: i64) -> Self {
        Task {
            id: new_id(),
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            completed: false,
            due_date: draft.due_date,
            subtasks: Vec::new(),
            created_at,
        }
    }

    /// Completed and total subtask counts.
    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self.subtasks.iter().filter(|s| s.completed).count();
        (done, self.subtasks.len())
    }

    /// Share of completed subtasks as a whole percentage, 0 without subtasks.
    pub fn subtask_percent(&self) -> u16 {
        match self.subtask_progress() {
            (_, 0) => 0,
            (done, total) => ((done as f64 / total as f64) * 100.0).round() as u16,
        }
    }

    /// A task is overdue when its due date has passed and it is still open.
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        !self.completed && self.due_date.is_some_and(|d| d < now)
    }

    /// Case-insensitive substring match on the title or description.
    /// `needle` must already be lowercased.
    pub fn matches_search(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(needle)
            || self
                .description
                .as_ref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
    }

    /// First eight characters of the id, enough to address a task by hand.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

impl SubTask {
    pub fn new(title: impl Into<String>) -> Self {
        SubTask {
            id: new_id(),
            title: title.into(),
            completed: false,
        }
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_snapshot_field_names() {
        let raw = r#"{
            "id": "3f1c",
            "title": "Buy milk",
            "priority": "HIGH",
            "completed": false,
            "dueDate": "2024-05-01T10:00",
            "subtasks": [{"id": "a1", "title": "Find shop", "completed": true}],
            "createdAt": 1714550400000
        }"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.description, None);
        assert_eq!(
            task.due_date,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(10, 0, 0)
        );
        assert_eq!(task.subtask_progress(), (1, 1));

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["dueDate"], "2024-05-01T10:00:00");
        assert_eq!(json["createdAt"], 1714550400000i64);
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_unreadable_due_date_is_dropped() {
        let raw = r#"{"id":"x","title":"t","priority":"LOW","dueDate":"someday","createdAt":1}"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.due_date, None);
        assert!(task.subtasks.is_empty());
        assert!(!task.completed);
    }

    #[test]
    fn test_matches_search() {
        let mut task = Task::from_draft(
            TaskDraft {
                title: "подготовить ОТЧЕТ по продажам".into(),
                ..Default::default()
            },
            0,
        );
        assert!(task.matches_search(&"Отчет".to_lowercase()));
        assert!(task.matches_search(""));
        assert!(!task.matches_search("zzz"));
        task.description = Some("Quarterly Numbers".into());
        assert!(task.matches_search("numbers"));
    }

    #[test]
    fn test_from_draft_keeps_given_fields() {
        let task = Task::from_draft(
            TaskDraft {
                title: "buy milk".into(),
                description: Some(String::new()),
                ..Default::default()
            },
            42,
        );
        assert_eq!(task.description.as_deref(), Some(""));
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.created_at, 42);
        assert_eq!(task.subtask_percent(), 0);
        assert_eq!(task.short_id().len(), 8);
    }

    #[test]
    fn test_is_overdue() {
        let now = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let mut task = Task::from_draft(
            TaskDraft {
                title: "t".into(),
                due_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(9, 0, 0),
                ..Default::default()
            },
            0,
        );
        assert!(task.is_overdue(now));
        task.completed = true;
        assert!(!task.is_overdue(now));
    }
}
