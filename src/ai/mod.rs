//! Assisted task capture.
//!
//! Two collaborators sit behind traits so the surfaces and tests never depend
//! on a live service:
//!
//! - a [`TaskParser`] turns free text into a structured task;
//! - a [`SubtaskGenerator`] breaks a task into a handful of steps.
//!
//! Replies are untrusted: they are decoded into typed records here and any
//! mismatch becomes an [`AiError`]. The `*_or_*` wrappers then recover from
//! every failure locally, so callers always get something usable.

mod gemini;

pub use gemini::{GeminiClient, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};

use chrono::{DateTime, Local, NaiveDateTime};
use serde::Deserialize;

use crate::dates::parse_timestamp;
use crate::error::AiError;
use crate::fields::Priority;
use crate::task::{Task, TaskDraft};

/// A task as understood from free text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDateTime>,
}

impl From<ParsedTask> for TaskDraft {
    fn from(p: ParsedTask) -> Self {
        TaskDraft {
            title: p.title,
            description: Some(p.description),
            priority: p.priority,
            due_date: p.due_date,
        }
    }
}

/// Turns free text into a structured task.
pub trait TaskParser {
    /// `now` is the reference point for relative dates such as "tomorrow".
    fn parse_task(&self, input: &str, now: DateTime<Local>) -> Result<ParsedTask, AiError>;
}

/// Breaks a task into short actionable steps.
pub trait SubtaskGenerator {
    fn generate_subtasks(&self, title: &str, description: Option<&str>) -> Result<Vec<String>, AiError>;
}

/// The collaborators a surface needs, boxed so tests can substitute stubs.
pub struct Assistants {
    pub parser: Box<dyn TaskParser>,
    pub generator: Box<dyn SubtaskGenerator>,
}

impl Assistants {
    pub fn gemini(config: GeminiConfig) -> Self {
        let client = GeminiClient::new(config);
        Assistants {
            parser: Box::new(client.clone()),
            generator: Box::new(client),
        }
    }
}

/// The draft used when the parser cannot help: the raw input as title.
pub fn fallback_draft(input: &str) -> TaskDraft {
    TaskDraft {
        title: input.to_string(),
        description: Some(String::new()),
        priority: Priority::Medium,
        due_date: None,
    }
}

/// Parse free text into a draft, falling back to [`fallback_draft`] on any failure.
pub fn parse_or_fallback(parser: &dyn TaskParser, input: &str) -> TaskDraft {
    match parser.parse_task(input, Local::now()) {
        Ok(parsed) => parsed.into(),
        Err(e) => {
            tracing::warn!(error = %e, "task parsing failed, using raw input");
            fallback_draft(input)
        }
    }
}

/// Generate subtasks for a task, returning an empty list on any failure.
pub fn subtasks_or_empty(generator: &dyn SubtaskGenerator, task: &Task) -> Vec<String> {
    match generator.generate_subtasks(&task.title, task.description.as_deref()) {
        Ok(subtasks) => subtasks,
        Err(e) => {
            tracing::warn!(task_id = %task.id, error = %e, "subtask generation failed");
            Vec::new()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParsedTask {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
}

/// Decode the parser's JSON reply into a [`ParsedTask`].
pub fn decode_parsed_task(text: &str) -> Result<ParsedTask, AiError> {
    let raw: RawParsedTask = serde_json::from_str(text.trim())?;

    let title = raw.title.trim().to_string();
    if title.is_empty() {
        return Err(AiError::Schema("title is empty".into()));
    }
    let priority = match raw.priority.as_deref().map(str::trim) {
        None | Some("") => Priority::Medium,
        Some(p) => Priority::from_wire(p)
            .ok_or_else(|| AiError::Schema(format!("unknown priority {:?}", p)))?,
    };
    let due_date = match raw.due_date.as_deref().map(str::trim) {
        None | Some("") | Some("null") => None,
        Some(d) => Some(
            parse_timestamp(d).ok_or_else(|| AiError::Schema(format!("unreadable dueDate {:?}", d)))?,
        ),
    };

    Ok(ParsedTask {
        title,
        description: raw.description.map(|d| d.trim().to_string()).unwrap_or_default(),
        priority,
        due_date,
    })
}

/// Decode the generator's JSON reply: an array of strings. Blank items are dropped.
pub fn decode_subtasks(text: &str) -> Result<Vec<String>, AiError> {
    let items: Vec<String> = serde_json::from_str(text.trim())?;
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}


#[cfg(test)]
mod tests {
    use super::testing::StubAssistant;
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_fallback_on_parser_failure() {
        let draft = parse_or_fallback(&StubAssistant::failing(), "buy milk");
        assert_eq!(draft.title, "buy milk");
        assert_eq!(draft.description.as_deref(), Some(""));
        assert_eq!(draft.priority, Priority::Medium);
        assert_eq!(draft.due_date, None);
    }

    #[test]
    fn test_parsed_task_becomes_draft() {
        let parsed = ParsedTask {
            title: "Sales report".into(),
            description: "for Friday".into(),
            priority: Priority::High,
            due_date: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap().and_hms_opt(18, 0, 0),
        };
        let draft = parse_or_fallback(&StubAssistant::with_parsed(parsed.clone()), "anything");
        assert_eq!(draft.title, parsed.title);
        assert_eq!(draft.description.as_deref(), Some("for Friday"));
        assert_eq!(draft.priority, Priority::High);
        assert_eq!(draft.due_date, parsed.due_date);
    }

    #[test]
    fn test_subtasks_or_empty() {
        let task = Task::from_draft(TaskDraft { title: "t".into(), ..Default::default() }, 0);
        assert!(subtasks_or_empty(&StubAssistant::failing(), &task).is_empty());
        assert_eq!(
            subtasks_or_empty(&StubAssistant::with_subtasks(&["a", "b"]), &task),
            ["a", "b"]
        );
    }

    #[test]
    fn test_decode_parsed_task_defaults() {
        let parsed = decode_parsed_task(r#"{"title": "Call mom"}"#).unwrap();
        assert_eq!(parsed.title, "Call mom");
        assert_eq!(parsed.description, "");
        assert_eq!(parsed.priority, Priority::Medium);
        assert_eq!(parsed.due_date, None);

        let parsed = decode_parsed_task(
            r#"{"title": " Report ", "description": "Q2", "priority": "HIGH", "dueDate": "2024-05-03T18:00:00"}"#,
        )
        .unwrap();
        assert_eq!(parsed.title, "Report");
        assert_eq!(parsed.priority, Priority::High);
        assert_eq!(parsed.due_date, NaiveDate::from_ymd_opt(2024, 5, 3).unwrap().and_hms_opt(18, 0, 0));

        let parsed = decode_parsed_task(r#"{"title": "x", "priority": "LOW", "dueDate": null}"#).unwrap();
        assert_eq!(parsed.due_date, None);
    }

    #[test]
    fn test_decode_parsed_task_rejects_mismatches() {
        for bad in [
            "not json",
            "[]",
            r#"{"description": "no title"}"#,
            r#"{"title": "   "}"#,
            r#"{"title": 7}"#,
            r#"{"title": "x", "priority": "URGENT"}"#,
            r#"{"title": "x", "dueDate": "whenever"}"#,
        ] {
            assert!(
                matches!(decode_parsed_task(bad), Err(AiError::Schema(_))),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn test_decode_subtasks() {
        assert_eq!(
            decode_subtasks(r#"["Outline", " ", "Draft "]"#).unwrap(),
            ["Outline", "Draft"]
        );
        assert!(decode_subtasks("[]").unwrap().is_empty());
        assert!(decode_subtasks(r#"{"items": []}"#).is_err());
        assert!(decode_subtasks(r#"[1, 2]"#).is_err());
    }
}
