//! Main application logic for the terminal user interface.
//!
//! This module contains the `App` struct which manages the TUI state,
//! handles user input, renders the interface, and coordinates between
//! the task list, the detail view, the add form and dialogs.
//!
//! Assistant calls block. A key that needs one only queues a
//! [`PendingAction`]; the run loop draws the busy overlay first, performs the
//! call, then drops any keys typed while it was waiting.

use std::io;
use std::time::Duration;

use chrono::{DateTime, Local, Timelike};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Frame, Terminal,
};

use crate::ai::{parse_or_fallback, subtasks_or_empty, Assistants};
use crate::celebrate::{Celebration, CelebrationQueue};
use crate::cmd::{format_priority, format_progress};
use crate::dates::{format_due_absolute, format_due_relative};
use crate::fields::Filter;
use crate::store::TaskStore;
use crate::task::Task;
use crate::tui::{
    colors::{priority_color, ACCENT, DARK_GREEN, DARK_RED},
    enums::{AddMode, AppState, InputMode, PendingAction},
    input::InputField,
    task_form::{TaskForm, DESCRIPTION_FIELD, DUE_FIELD, PRIORITY_FIELD, TITLE_FIELD},
    utils::{centered_rect, greeting},
};
use crate::view::{project, TaskStats};

/// Main application state for the terminal user interface.
pub struct App {
    state: AppState,
    store: TaskStore,
    celebrations: CelebrationQueue,
    assistants: Assistants,
    task_list_state: TableState,
    filtered_tasks: Vec<String>,
    stats: TaskStats,
    selected_task: Option<String>,
    subtask_cursor: usize,
    subtask_input: InputField,
    filter: Filter,
    search: InputField,
    input_mode: InputMode,
    task_form: TaskForm,
    status_message: String,
    status_color: Color,
    confirm_target: Option<String>,
    confirm_return: AppState,
    pending: Option<PendingAction>,
}

impl App {
    /// `celebrations` must be the queue the store fires into.
    pub fn new(store: TaskStore, celebrations: CelebrationQueue, assistants: Assistants) -> Self {
        let mut app = App {
            state: AppState::TaskList,
            store,
            celebrations,
            assistants,
            task_list_state: TableState::default(),
            filtered_tasks: Vec::new(),
            stats: TaskStats::default(),
            selected_task: None,
            subtask_cursor: 0,
            subtask_input: InputField::new(),
            filter: Filter::Active,
            search: InputField::new(),
            input_mode: InputMode::None,
            task_form: TaskForm::new(),
            status_message: String::new(),
            status_color: ACCENT,
            confirm_target: None,
            confirm_return: AppState::TaskList,
            pending: None,
        };
        app.update_filtered_tasks();
        app
    }

    /// Recompute the visible list from the store, keeping the selection on the
    /// same task when it is still visible and on the same row otherwise.
    fn update_filtered_tasks(&mut self) {
        let old_index = self.task_list_state.selected();
        let old_selected_id = old_index.and_then(|idx| self.filtered_tasks.get(idx)).cloned();

        let view = project(self.store.tasks(), self.filter, &self.search.value);
        self.stats = view.stats;
        self.filtered_tasks = view.tasks.iter().map(|t| t.id.clone()).collect();

        let restored = old_selected_id
            .and_then(|id| self.filtered_tasks.iter().position(|t| *t == id))
            .or_else(|| match (old_index, self.filtered_tasks.len()) {
                (_, 0) => None,
                (Some(idx), len) => Some(idx.min(len - 1)),
                (None, _) => Some(0),
            });
        self.task_list_state.select(restored);
    }

    /// Report celebrations and persistence failures, then refresh the list.
    fn after_mutation(&mut self) {
        if let Some(celebration) = self.celebrations.drain().pop() {
            let color = match celebration {
                Celebration::Small => ACCENT,
                Celebration::Large => DARK_GREEN,
            };
            self.set_status(celebration.message().to_string(), color);
        }
        if let Some(e) = self.store.take_persist_error() {
            self.set_status(format!("Could not save tasks: {}", e), DARK_RED);
        }
        self.update_filtered_tasks();
    }

    fn select_task(&mut self, id: &str) {
        if let Some(idx) = self.filtered_tasks.iter().position(|t| t == id) {
            self.task_list_state.select(Some(idx));
        }
    }

    fn highlighted_task_id(&self) -> Option<String> {
        self.task_list_state
            .selected()
            .and_then(|idx| self.filtered_tasks.get(idx))
            .cloned()
    }

    fn get_selected_task(&self) -> Option<&Task> {
        self.selected_task.as_deref().and_then(|id| self.store.get(id))
    }

    fn set_status(&mut self, msg: String, color: Color) {
        self.status_message = msg;
        self.status_color = color;
    }

    fn set_status_message(&mut self, msg: String) {
        self.set_status(msg, ACCENT);
    }

    fn clear_status_message(&mut self) {
        self.status_message.clear();
        self.status_color = ACCENT;
    }

    fn open_add_form(&mut self) {
        self.task_form = TaskForm::new();
        self.state = AppState::AddTask;
    }

    fn ask_delete(&mut self, task_id: String) {
        self.confirm_target = Some(task_id);
        self.confirm_return = self.state;
        self.state = AppState::Confirm;
    }

    fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
        self.task_list_state.select(None);
        self.update_filtered_tasks();
    }

    /// Run the queued assistant call, if any.
    pub fn process_pending(&mut self) {
        let Some(action) = self.pending.take() else {
            return;
        };
        match action {
            PendingAction::ParseTask(input) => {
                let draft = parse_or_fallback(self.assistants.parser.as_ref(), &input);
                let id = self.store.create(draft);
                self.task_form = TaskForm::new();
                self.state = AppState::TaskList;
                self.after_mutation();
                self.select_task(&id);
            }
            PendingAction::Breakdown(task_id) => {
                let titles = match self.store.get(&task_id) {
                    Some(task) => subtasks_or_empty(self.assistants.generator.as_ref(), task),
                    None => return,
                };
                if titles.is_empty() {
                    self.set_status_message("No subtasks suggested".to_string());
                    return;
                }
                self.set_status_message(format!("Added {} subtasks", titles.len()));
                self.store.append_subtasks(&task_id, &titles);
                self.after_mutation();
            }
        }
    }

    /// Handle one key press. Returns true if the application should quit.
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        if key == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }
        self.clear_status_message();

        match self.state {
            AppState::TaskList => self.handle_task_list_input(key, modifiers),
            AppState::TaskDetail => self.handle_detail_input(key, modifiers),
            AppState::AddTask => self.handle_form_input(key, modifiers),
            AppState::Help => self.handle_help_input(key, modifiers),
            AppState::Confirm => self.handle_confirm_input(key, modifiers),
        }
    }

    fn handle_task_list_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> bool {
        if self.input_mode == InputMode::Search {
            match key {
                KeyCode::Esc => {
                    self.input_mode = InputMode::None;
                    self.search.clear();
                    self.update_filtered_tasks();
                }
                KeyCode::Enter => {
                    self.input_mode = InputMode::None;
                }
                KeyCode::Backspace => {
                    self.search.handle_backspace();
                    self.update_filtered_tasks();
                }
                KeyCode::Left => self.search.move_cursor_left(),
                KeyCode::Right => self.search.move_cursor_right(),
                KeyCode::Char(c) => {
                    self.search.handle_char(c);
                    self.update_filtered_tasks();
                }
                _ => {}
            }
            return false;
        }

        match key {
            KeyCode::Char('q') => return true,
            KeyCode::Esc => {
                if self.search.value.is_empty() {
                    return true;
                }
                self.search.clear();
                self.update_filtered_tasks();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(selected) = self.task_list_state.selected() {
                    if selected > 0 {
                        self.task_list_state.select(Some(selected - 1));
                    }
                } else if !self.filtered_tasks.is_empty() {
                    self.task_list_state.select(Some(0));
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(selected) = self.task_list_state.selected() {
                    if selected + 1 < self.filtered_tasks.len() {
                        self.task_list_state.select(Some(selected + 1));
                    }
                } else if !self.filtered_tasks.is_empty() {
                    self.task_list_state.select(Some(0));
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(id) = self.highlighted_task_id() {
                    self.selected_task = Some(id);
                    self.subtask_cursor = 0;
                    self.state = AppState::TaskDetail;
                }
            }
            KeyCode::Char('a') | KeyCode::Char('n') => self.open_add_form(),
            KeyCode::Char('x') | KeyCode::Char('c') => {
                if let Some(id) = self.highlighted_task_id() {
                    self.store.toggle_completion(&id);
                    self.after_mutation();
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.highlighted_task_id() {
                    self.ask_delete(id);
                }
            }
            KeyCode::Char('/') => self.input_mode = InputMode::Search,
            KeyCode::Char('1') => self.set_filter(Filter::All),
            KeyCode::Char('2') => self.set_filter(Filter::Active),
            KeyCode::Char('3') => self.set_filter(Filter::Completed),
            KeyCode::Tab => self.set_filter(self.filter.next()),
            KeyCode::Char('h') | KeyCode::Char('?') | KeyCode::F(1) => self.state = AppState::Help,
            _ => {}
        }
        false
    }

    fn handle_detail_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> bool {
        let Some(task_id) = self.selected_task.clone() else {
            self.state = AppState::TaskList;
            return false;
        };
        let subtask_count = self.store.get(&task_id).map_or(0, |t| t.subtasks.len());

        if self.input_mode == InputMode::Subtask {
            match key {
                KeyCode::Esc => {
                    self.input_mode = InputMode::None;
                    self.subtask_input.clear();
                }
                KeyCode::Enter => {
                    let title = self.subtask_input.take();
                    if title.is_empty() {
                        self.set_status_message("Subtask title cannot be empty".to_string());
                        return false;
                    }
                    self.input_mode = InputMode::None;
                    self.store.append_subtasks(&task_id, &[title]);
                    self.subtask_cursor = subtask_count;
                    self.after_mutation();
                }
                KeyCode::Backspace => self.subtask_input.handle_backspace(),
                KeyCode::Delete => self.subtask_input.handle_delete(),
                KeyCode::Left => self.subtask_input.move_cursor_left(),
                KeyCode::Right => self.subtask_input.move_cursor_right(),
                KeyCode::Char(c) => self.subtask_input.handle_char(c),
                _ => {}
            }
            return false;
        }

        match key {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.state = AppState::TaskList;
                self.select_task(&task_id);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.subtask_cursor = self.subtask_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.subtask_cursor + 1 < subtask_count {
                    self.subtask_cursor += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let subtask_id = self
                    .store
                    .get(&task_id)
                    .and_then(|t| t.subtasks.get(self.subtask_cursor))
                    .map(|s| s.id.clone());
                if let Some(subtask_id) = subtask_id {
                    self.store.toggle_subtask_completion(&task_id, &subtask_id);
                    self.after_mutation();
                }
            }
            KeyCode::Char('x') | KeyCode::Char('c') => {
                self.store.toggle_completion(&task_id);
                self.after_mutation();
            }
            KeyCode::Char('s') | KeyCode::Char('a') => {
                self.subtask_input.clear();
                self.input_mode = InputMode::Subtask;
            }
            KeyCode::Char('b') => {
                self.set_status_message("Breaking the task down...".to_string());
                self.pending = Some(PendingAction::Breakdown(task_id));
            }
            KeyCode::Char('d') | KeyCode::Delete => self.ask_delete(task_id),
            _ => {}
        }
        false
    }

    fn handle_form_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        match key {
            KeyCode::Esc => {
                self.state = AppState::TaskList;
            }
            KeyCode::Char('t') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.task_form.toggle_mode();
            }
            KeyCode::Enter => match self.task_form.mode {
                AddMode::Assisted => match self.task_form.assisted_input() {
                    Some(text) => {
                        self.set_status_message("Analyzing task...".to_string());
                        self.pending = Some(PendingAction::ParseTask(text));
                    }
                    None => self.set_status_message("Describe the task first".to_string()),
                },
                AddMode::Manual => match self.task_form.to_draft() {
                    Ok(draft) => {
                        let id = self.store.create(draft);
                        self.task_form = TaskForm::new();
                        self.state = AppState::TaskList;
                        self.after_mutation();
                        self.select_task(&id);
                    }
                    Err(msg) => self.set_status(msg, DARK_RED),
                },
            },
            KeyCode::Tab | KeyCode::Down => self.task_form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.task_form.prev_field(),
            KeyCode::Left => self.task_form.handle_left_right(false),
            KeyCode::Right => self.task_form.handle_left_right(true),
            KeyCode::Home => {
                if let Some(input) = self.task_form.active_input() {
                    input.move_home();
                }
            }
            KeyCode::End => {
                if let Some(input) = self.task_form.active_input() {
                    input.move_end();
                }
            }
            KeyCode::Backspace => self.task_form.handle_backspace(),
            KeyCode::Delete => self.task_form.handle_delete(),
            KeyCode::Char(c) => self.task_form.handle_char(c),
            _ => {}
        }
        false
    }

    fn handle_confirm_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> bool {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                if let Some(id) = self.confirm_target.take() {
                    self.store.delete(&id);
                    self.set_status_message("Task deleted".to_string());
                    self.after_mutation();
                }
                self.selected_task = None;
                self.state = AppState::TaskList;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm_target = None;
                self.state = self.confirm_return;
            }
            _ => {}
        }
        false
    }

    fn handle_help_input(&mut self, _key: KeyCode, _modifiers: KeyModifiers) -> bool {
        self.state = AppState::TaskList;
        false
    }

    /// Poll for and handle keyboard events based on current application state.
    ///
    /// Returns true if the application should quit.
    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(false);
                }
                return Ok(self.handle_key(key.code, key.modifiers));
            }
        }
        Ok(false)
    }

    /// Greeting, date, counters and the completion gauge.
    fn render_header(&mut self, f: &mut Frame, area: Rect) {
        let now = Local::now();
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(32)])
            .split(area);

        let text = vec![
            Line::from(vec![
                Span::styled(
                    format!("{}!", greeting(now.hour())),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(
                    now.format("%A, %d %B").to_string(),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
                ),
            ]),
            Line::from(format!(
                "{} active  {} done  {} total",
                self.stats.active, self.stats.completed, self.stats.total
            )),
        ];
        let header = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Smart Tasks"));
        f.render_widget(header, chunks[0]);

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress"))
            .gauge_style(Style::default().fg(DARK_GREEN))
            .percent(u16::from(self.stats.completion_rate))
            .label(format!("{}% done", self.stats.completion_rate));
        f.render_widget(gauge, chunks[1]);
    }

    /// Render the filter tabs and the task table.
    fn render_task_list(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);

        let tabs = Tabs::new(vec!["1 All", "2 Active", "3 Completed"])
            .block(Block::default().borders(Borders::ALL).title("Filter"))
            .select(self.filter.index())
            .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD | Modifier::REVERSED));
        f.render_widget(tabs, chunks[0]);

        if self.filtered_tasks.is_empty() {
            let message = if self.search.value.is_empty() {
                "All quiet. Time to plan something great! Press 'a' to add a task.".to_string()
            } else {
                format!("Nothing found for '{}'.", self.search.value)
            };
            let empty = Paragraph::new(message)
                .block(Block::default().borders(Borders::ALL).title("Tasks"))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            f.render_widget(empty, chunks[1]);
            return;
        }

        let header_cells = ["", "Priority", "Due", "Subtasks", "Title"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD)));
        let header = Row::new(header_cells)
            .style(Style::default().bg(ACCENT).fg(Color::White))
            .height(1);

        let now = Local::now().naive_local();
        let rows: Vec<Row> = self
            .filtered_tasks
            .iter()
            .filter_map(|id| self.store.get(id))
            .map(|task| {
                let due_style = if task.is_overdue(now) {
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let style = if task.completed {
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
                } else {
                    Style::default().fg(Color::White)
                };
                Row::new(vec![
                    Cell::from(if task.completed { "[x]" } else { "[ ]" }),
                    Cell::from(Span::styled(
                        format_priority(task.priority),
                        Style::default().fg(priority_color(task.priority)),
                    )),
                    Cell::from(Span::styled(format_due_relative(task.due_date, now), due_style)),
                    Cell::from(format_progress(task)),
                    Cell::from(task.title.clone()),
                ])
                .style(style)
            })
            .collect();

        let widths = [
            Constraint::Length(3),
            Constraint::Length(8),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Min(20),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Tasks ({}/{}) - Press 'h' for help",
                self.filtered_tasks.len(),
                self.stats.total
            )))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, chunks[1], &mut self.task_list_state);
    }

    /// Render the detailed view of a single task.
    fn render_task_detail(&mut self, f: &mut Frame, area: Rect) {
        let Some(task) = self.get_selected_task() else {
            return;
        };
        let now = Local::now().naive_local();

        let title_style = if task.completed {
            Style::default().add_modifier(Modifier::BOLD | Modifier::CROSSED_OUT)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let mut lines = vec![
            Line::from(Span::styled(task.title.clone(), title_style)),
            Line::from(""),
            Line::from(format!("Status:   {}", if task.completed { "Done" } else { "Open" })),
            Line::from(vec![
                Span::raw("Priority: "),
                Span::styled(
                    format_priority(task.priority),
                    Style::default().fg(priority_color(task.priority)),
                ),
            ]),
        ];
        if let Some(due) = task.due_date {
            let style = if task.is_overdue(now) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![
                Span::raw("Due:      "),
                Span::styled(
                    format!("{} ({})", format_due_absolute(due), format_due_relative(Some(due), now)),
                    style,
                ),
            ]));
        }
        if let Some(created) = DateTime::from_timestamp_millis(task.created_at) {
            lines.push(Line::from(format!(
                "Created:  {}",
                created.with_timezone(&Local).format("%a %d %b %Y %H:%M")
            )));
        }
        lines.push(Line::from(""));
        match task.description.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(desc) => lines.push(Line::from(desc.to_string())),
            None => lines.push(Line::from(Span::styled(
                "No description.",
                Style::default().fg(Color::DarkGray),
            ))),
        }
        lines.push(Line::from(""));

        let (done, total) = task.subtask_progress();
        lines.push(Line::from(Span::styled(
            format!("Subtasks ({}/{}, {}%)", done, total, task.subtask_percent()),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        if task.subtasks.is_empty() {
            lines.push(Line::from(Span::styled(
                "  None yet. Press 's' to add one or 'b' to break the task down.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        for (i, subtask) in task.subtasks.iter().enumerate() {
            let marker = if i == self.subtask_cursor { "▸" } else { " " };
            let check = if subtask.completed { "[x]" } else { "[ ]" };
            let style = match (i == self.subtask_cursor, subtask.completed) {
                (true, _) => Style::default().fg(Color::Black).bg(Color::Gray),
                (false, true) => Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT),
                (false, false) => Style::default(),
            };
            lines.push(Line::from(Span::styled(
                format!("{} {} {}", marker, check, subtask.title),
                style,
            )));
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(if self.input_mode == InputMode::Subtask {
                [Constraint::Min(0), Constraint::Length(3)]
            } else {
                [Constraint::Min(0), Constraint::Length(0)]
            })
            .split(area);

        let details = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Task - x: done  s: add subtask  b: break down  d: delete  Esc: back"),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(details, chunks[0]);

        if self.input_mode == InputMode::Subtask {
            self.render_input(f, chunks[1], "New subtask (Enter to add, Esc to cancel)", &self.subtask_input, true);
        }
    }

    fn render_input(&self, f: &mut Frame, area: Rect, title: &str, input: &InputField, focused: bool) {
        let border = if focused {
            Style::default().fg(ACCENT)
        } else {
            Style::default()
        };
        let block = Block::default().borders(Borders::ALL).title(title.to_string()).border_style(border);
        let inner = block.inner(area);
        f.render_widget(Paragraph::new(input.value.clone()).block(block), area);
        if focused {
            let x = inner.x + (input.cursor as u16).min(inner.width.saturating_sub(1));
            f.set_cursor_position((x, inner.y));
        }
    }

    /// Render the add form in its current mode.
    fn render_task_form(&mut self, f: &mut Frame, area: Rect) {
        match self.task_form.mode {
            AddMode::Assisted => {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(3), Constraint::Min(0)])
                    .split(area);
                self.render_input(
                    f,
                    chunks[0],
                    "Describe your task (Enter to analyze, Ctrl+T for manual entry)",
                    &self.task_form.prompt,
                    true,
                );
                let hints = Paragraph::new(vec![
                    Line::from("Write it the way you would say it, for example:"),
                    Line::from(Span::styled(
                        "  finish the sales report by friday evening, it's urgent",
                        Style::default().fg(Color::Cyan),
                    )),
                    Line::from(""),
                    Line::from("Title, priority and due date are filled in for you."),
                    Line::from("If the assistant is unavailable your text becomes the title."),
                ])
                .block(Block::default().borders(Borders::ALL).title("Smart add"))
                .wrap(Wrap { trim: false });
                f.render_widget(hints, chunks[1]);
            }
            AddMode::Manual => {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Min(0),
                    ])
                    .split(area);
                let current = self.task_form.current_field;
                self.render_input(f, chunks[TITLE_FIELD], "Title", &self.task_form.title, current == TITLE_FIELD);
                self.render_input(
                    f,
                    chunks[DESCRIPTION_FIELD],
                    "Description",
                    &self.task_form.description,
                    current == DESCRIPTION_FIELD,
                );

                let priority = self.task_form.priority;
                let border = if current == PRIORITY_FIELD {
                    Style::default().fg(ACCENT)
                } else {
                    Style::default()
                };
                let selector = Paragraph::new(Line::from(vec![
                    Span::raw("< "),
                    Span::styled(
                        format_priority(priority),
                        Style::default().fg(priority_color(priority)).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(" >"),
                ]))
                .block(Block::default().borders(Borders::ALL).title("Priority").border_style(border));
                f.render_widget(selector, chunks[PRIORITY_FIELD]);

                self.render_input(
                    f,
                    chunks[DUE_FIELD],
                    "Due (YYYY-MM-DD [HH:MM], today, tomorrow, in 3d, next fri)",
                    &self.task_form.due,
                    current == DUE_FIELD,
                );

                let hints = Paragraph::new(
                    "Tab/Up/Down: move between fields  Left/Right: change priority  Enter: save  Ctrl+T: smart add  Esc: cancel",
                )
                .block(Block::default().borders(Borders::ALL).title("Manual entry"))
                .wrap(Wrap { trim: true });
                f.render_widget(hints, chunks[4]);
            }
        }
    }

    fn render_help(&mut self, f: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let help_text = vec![
            Line::from(vec![Span::styled("Smart Tasks Help", bold)]),
            Line::from(""),
            Line::from(vec![Span::styled("Task List:", bold)]),
            Line::from("  ↑/↓, k/j      Navigate tasks"),
            Line::from("  Enter/Space   View task details"),
            Line::from("  a             Add new task"),
            Line::from("  x/c           Toggle task completion"),
            Line::from("  d             Delete selected task"),
            Line::from("  1/2/3, Tab    Show all / active / completed"),
            Line::from("  /             Search titles and descriptions"),
            Line::from("  h/?/F1        Show this help"),
            Line::from("  q/Esc/Ctrl+C  Quit"),
            Line::from(""),
            Line::from(vec![Span::styled("Task Detail View:", bold)]),
            Line::from("  ↑/↓           Select subtask"),
            Line::from("  Enter/Space   Toggle selected subtask"),
            Line::from("  s             Add a subtask"),
            Line::from("  b             Break the task down with the assistant"),
            Line::from("  x/c           Toggle task completion"),
            Line::from("  d             Delete task"),
            Line::from("  Esc/q         Back to task list"),
            Line::from(""),
            Line::from(vec![Span::styled("Add Form:", bold)]),
            Line::from("  Ctrl+T        Switch between smart and manual entry"),
            Line::from("  Tab/↑/↓       Navigate between fields"),
            Line::from("  ←/→           Change priority"),
            Line::from("  Enter         Create task"),
            Line::from("  Esc           Cancel and return"),
        ];

        let paragraph = Paragraph::new(help_text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Help - Press any key to return"),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(paragraph, area);
    }

    /// Render a confirmation dialog for deletion.
    fn render_confirm(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Confirm Action")
            .borders(Borders::ALL)
            .style(Style::default().bg(DARK_RED));

        let area = centered_rect(50, 20, area);
        f.render_widget(Clear, area);

        let title = self
            .confirm_target
            .as_deref()
            .and_then(|id| self.store.get(id))
            .map(|t| t.title.clone())
            .unwrap_or_default();
        let text = vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                "Delete this task and its subtasks?",
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(title),
            Line::from(""),
            Line::from("Press 'y' to confirm, 'n' to cancel"),
        ];

        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });

        f.render_widget(paragraph, area);
    }

    /// Overlay shown while an assistant call blocks the loop.
    fn render_busy(&mut self, f: &mut Frame, area: Rect) {
        let message = match self.pending {
            Some(PendingAction::ParseTask(_)) => "Analyzing your task...",
            Some(PendingAction::Breakdown(_)) => "Breaking the task down...",
            None => return,
        };
        let area = centered_rect(40, 20, area);
        f.render_widget(Clear, area);
        let paragraph = Paragraph::new(vec![Line::from(""), Line::from(message)])
            .block(Block::default().borders(Borders::ALL).title("Thinking").border_style(Style::default().fg(ACCENT)))
            .alignment(Alignment::Center);
        f.render_widget(paragraph, area);
    }

    /// Render the status bar at the bottom of the screen.
    fn render_status_bar(&mut self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else if self.input_mode == InputMode::Search {
            format!("Search: {} (Esc to clear, Enter to confirm)", self.search.value)
        } else if !self.search.value.is_empty() && self.state == AppState::TaskList {
            format!(
                "Tasks: {} (matching '{}') | Press 'h' for help",
                self.filtered_tasks.len(),
                self.search.value
            )
        } else {
            match self.state {
                AppState::TaskList => format!("Tasks: {} | Press 'h' for help", self.filtered_tasks.len()),
                AppState::TaskDetail => "Task Details".to_string(),
                AppState::AddTask => "Add New Task".to_string(),
                AppState::Help => "Help".to_string(),
                AppState::Confirm => "Confirm Action".to_string(),
            }
        };

        let status = Paragraph::new(status_text)
            .style(Style::default().bg(self.status_color).fg(Color::White))
            .alignment(Alignment::Left);

        f.render_widget(status, area);
    }

    /// Main render function that dispatches to appropriate view renderers.
    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        self.render_header(f, chunks[0]);
        match self.state {
            AppState::TaskList => self.render_task_list(f, chunks[1]),
            AppState::TaskDetail => self.render_task_detail(f, chunks[1]),
            AppState::AddTask => self.render_task_form(f, chunks[1]),
            AppState::Help => self.render_help(f, chunks[1]),
            AppState::Confirm => {
                match self.confirm_return {
                    AppState::TaskDetail => self.render_task_detail(f, chunks[1]),
                    _ => self.render_task_list(f, chunks[1]),
                }
                self.render_confirm(f, chunks[1]);
            }
        }
        self.render_busy(f, chunks[1]);

        self.render_status_bar(f, chunks[2]);
    }

    /// Main event loop for the TUI application.
    ///
    /// Handles rendering and input processing until the user exits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.pending.is_some() {
                self.process_pending();
                // Keys typed while waiting are dropped.
                while event::poll(Duration::ZERO)? {
                    event::read()?;
                }
                continue;
            }

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}
