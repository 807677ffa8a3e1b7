//! Enumerations for TUI state management.

/// Application state for the terminal user interface.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AppState {
    TaskList,
    TaskDetail,
    AddTask,
    Help,
    Confirm,
}

/// Input mode for text entry fields.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum InputMode {
    None,
    /// Typing into the list search box.
    Search,
    /// Typing a subtask title in the detail view.
    Subtask,
}

/// How the add form turns input into a task.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AddMode {
    /// One free-text prompt sent to the parser.
    Assisted,
    /// Explicit title, description, priority and due fields.
    Manual,
}

/// A blocking assistant call queued for after the busy overlay is drawn.
#[derive(Clone, PartialEq, Debug)]
pub enum PendingAction {
    ParseTask(String),
    Breakdown(String),
}
