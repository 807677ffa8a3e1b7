//! Task form handling for the terminal user interface.
//!
//! The add screen has two modes. Assisted mode is a single free-text prompt
//! handed to the task parser; manual mode edits the fields directly. Ctrl+T
//! switches between them and carries the typed text across.

use crate::dates::parse_due_input;
use crate::fields::Priority;
use crate::task::TaskDraft;
use crate::tui::{enums::AddMode, input::InputField};

/// Field order in manual mode.
pub const TITLE_FIELD: usize = 0;
pub const DESCRIPTION_FIELD: usize = 1;
pub const PRIORITY_FIELD: usize = 2;
pub const DUE_FIELD: usize = 3;
const FIELD_COUNT: usize = 4;

pub struct TaskForm {
    pub mode: AddMode,
    pub prompt: InputField,
    pub title: InputField,
    pub description: InputField,
    pub priority: Priority,
    pub due: InputField,
    pub current_field: usize,
}

impl TaskForm {
    /// An empty form in assisted mode.
    pub fn new() -> Self {
        Self {
            mode: AddMode::Assisted,
            prompt: InputField::new(),
            title: InputField::new(),
            description: InputField::new(),
            priority: Priority::Medium,
            due: InputField::new(),
            current_field: TITLE_FIELD,
        }
    }

    /// Switch between assisted and manual entry.
    pub fn toggle_mode(&mut self) {
        match self.mode {
            AddMode::Assisted => {
                if self.title.value.trim().is_empty() {
                    self.title = InputField::with_value(self.prompt.value.trim());
                }
                self.current_field = TITLE_FIELD;
                self.mode = AddMode::Manual;
            }
            AddMode::Manual => {
                if self.prompt.value.trim().is_empty() {
                    self.prompt = InputField::with_value(self.title.value.trim());
                }
                self.mode = AddMode::Assisted;
            }
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % FIELD_COUNT;
    }

    pub fn prev_field(&mut self) {
        self.current_field = (self.current_field + FIELD_COUNT - 1) % FIELD_COUNT;
    }

    /// The text input that currently has focus, if any.
    pub fn active_input(&mut self) -> Option<&mut InputField> {
        match (self.mode, self.current_field) {
            (AddMode::Assisted, _) => Some(&mut self.prompt),
            (AddMode::Manual, TITLE_FIELD) => Some(&mut self.title),
            (AddMode::Manual, DESCRIPTION_FIELD) => Some(&mut self.description),
            (AddMode::Manual, DUE_FIELD) => Some(&mut self.due),
            _ => None,
        }
    }

    pub fn handle_char(&mut self, c: char) {
        if let Some(input) = self.active_input() {
            input.handle_char(c);
        }
    }

    pub fn handle_backspace(&mut self) {
        if let Some(input) = self.active_input() {
            input.handle_backspace();
        }
    }

    pub fn handle_delete(&mut self) {
        if let Some(input) = self.active_input() {
            input.handle_delete();
        }
    }

    /// Left/Right moves the cursor in text fields and cycles the priority selector.
    pub fn handle_left_right(&mut self, right: bool) {
        if self.mode == AddMode::Manual && self.current_field == PRIORITY_FIELD {
            self.priority = if right {
                self.priority.cycle()
            } else {
                self.priority.cycle().cycle()
            };
            return;
        }
        if let Some(input) = self.active_input() {
            if right {
                input.move_cursor_right();
            } else {
                input.move_cursor_left();
            }
        }
    }

    /// The trimmed assisted prompt, or `None` when it is blank.
    pub fn assisted_input(&self) -> Option<String> {
        let text = self.prompt.value.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Validate the manual fields into a draft.
    pub fn to_draft(&self) -> Result<TaskDraft, String> {
        let title = self.title.value.trim();
        if title.is_empty() {
            return Err("Title is required".to_string());
        }
        let due = self.due.value.trim();
        let due_date = if due.is_empty() {
            None
        } else {
            Some(parse_due_input(due).ok_or_else(|| format!("Could not understand due date '{}'", due))?)
        };
        let description = self.description.value.trim();

        Ok(TaskDraft {
            title: title.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            priority: self.priority,
            due_date,
        })
    }
}

impl Default for TaskForm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(form: &mut TaskForm, text: &str) {
        for c in text.chars() {
            form.handle_char(c);
        }
    }

    #[test]
    fn test_toggle_mode_carries_text() {
        let mut form = TaskForm::new();
        type_text(&mut form, "call mom");
        form.toggle_mode();
        assert_eq!(form.mode, AddMode::Manual);
        assert_eq!(form.title.value, "call mom");

        form.prompt.clear();
        form.toggle_mode();
        assert_eq!(form.mode, AddMode::Assisted);
        assert_eq!(form.prompt.value, "call mom");
    }

    #[test]
    fn test_to_draft_validates() {
        let mut form = TaskForm::new();
        form.toggle_mode();
        assert_eq!(form.to_draft().unwrap_err(), "Title is required");

        type_text(&mut form, "Report");
        form.next_field();
        type_text(&mut form, "  ");
        form.next_field();
        form.handle_left_right(true);
        assert_eq!(form.priority, Priority::High);
        form.next_field();
        type_text(&mut form, "someday maybe");
        assert!(form.to_draft().unwrap_err().contains("someday maybe"));

        form.due.clear();
        type_text(&mut form, "2024-05-03 18:00");
        let draft = form.to_draft().unwrap();
        assert_eq!(draft.title, "Report");
        assert_eq!(draft.description, None);
        assert_eq!(draft.priority, Priority::High);
        assert!(draft.due_date.is_some());
    }

    #[test]
    fn test_priority_cycles_both_ways() {
        let mut form = TaskForm::new();
        form.toggle_mode();
        form.current_field = PRIORITY_FIELD;
        form.handle_left_right(false);
        assert_eq!(form.priority, Priority::Low);
        form.handle_left_right(false);
        assert_eq!(form.priority, Priority::High);
        form.handle_char('x');
        assert!(form.title.value.is_empty());
    }

    #[test]
    fn test_assisted_input_blank() {
        let mut form = TaskForm::new();
        assert_eq!(form.assisted_input(), None);
        type_text(&mut form, "  buy milk ");
        assert_eq!(form.assisted_input().as_deref(), Some("buy milk"));
    }
}
