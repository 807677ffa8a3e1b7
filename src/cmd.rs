//! Command implementations for the CLI interface.
//!
//! Each subcommand validates its input at this boundary, calls the task store
//! and prints the outcome. Identifiers that match nothing are not an error:
//! the command leaves the collection untouched and says so.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use chrono::Local;

use crate::ai::{parse_or_fallback, subtasks_or_empty, Assistants};
use crate::dates::{format_due_absolute, format_due_relative, parse_due_input};
use crate::fields::{Filter, Priority};
use crate::store::TaskStore;
use crate::task::{Task, TaskDraft};
use crate::view::{project, TaskStats};

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive UI interface.
    Ui,

    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Priority: low | medium | high.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Due: YYYY-MM-DD [HH:MM], "today", "tomorrow", "in Nd", "next friday", "eow".
        #[arg(long)]
        due: Option<String>,
    },

    /// Describe a task in your own words and let the assistant fill in the fields.
    SmartAdd {
        /// Free text, e.g. "sales report by friday, important".
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List tasks, open first, then by priority and recency.
    List {
        /// Status filter.
        #[arg(long, value_enum, default_value_t = Filter::Active)]
        filter: Filter,
        /// Case-insensitive text to look for in titles and descriptions.
        #[arg(long, short)]
        search: Option<String>,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task with its subtasks.
    View {
        /// Task id, id prefix or title.
        task: String,
    },

    /// Mark a task done, or open again if it is done.
    Toggle {
        /// Task id, id prefix or title.
        task: String,
    },

    /// Delete a task and its subtasks.
    Delete {
        /// Task id, id prefix or title.
        task: String,
    },

    /// Manage subtasks of a task.
    Subtask {
        #[command(subcommand)]
        action: SubtaskAction,
    },

    /// Ask the assistant to break a task into subtasks.
    Breakdown {
        /// Task id, id prefix or title.
        task: String,
    },

    /// Show counters and completion rate.
    Stats,

    /// Generate shell completion scripts.
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SubtaskAction {
    /// Append subtasks in the given order.
    Add {
        /// Task id, id prefix or title.
        task: String,
        /// One or more subtask titles.
        #[arg(required = true, num_args = 1..)]
        titles: Vec<String>,
    },
    /// Flip a subtask between done and open.
    Toggle {
        /// Task id, id prefix or title.
        task: String,
        /// Subtask id, id prefix, 1-based position or title.
        subtask: String,
    },
}

/// Print a diagnostic if the last snapshot write failed.
fn report_persist_error(store: &mut TaskStore) {
    if let Some(e) = store.take_persist_error() {
        eprintln!("Failed to save tasks: {e}");
        std::process::exit(1);
    }
}

fn resolve_or_report(store: &TaskStore, identifier: &str) -> Option<String> {
    let resolved = store.resolve(identifier);
    if resolved.is_none() {
        tracing::debug!(identifier, "no task matches");
        println!("No changes.");
    }
    resolved
}

/// Add a new task from explicit fields.
pub fn cmd_add(
    store: &mut TaskStore,
    title: String,
    desc: Option<String>,
    priority: Priority,
    due: Option<String>,
) {
    if title.trim().is_empty() {
        eprintln!("Task title cannot be empty.");
        std::process::exit(2);
    }
    let due_date = match due.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => match parse_due_input(raw) {
            Some(d) => Some(d),
            None => {
                eprintln!("Could not understand due date '{}'.", raw);
                std::process::exit(2);
            }
        },
        None => None,
    };

    let id = store.create(TaskDraft {
        title: title.trim().to_string(),
        description: desc.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        priority,
        due_date,
    });
    report_persist_error(store);
    if let Some(task) = store.get(&id) {
        println!("Added task {}: {}", task.short_id(), task.title);
    }
}

/// Add a task from free text, using the assistant when it is available.
pub fn cmd_smart_add(store: &mut TaskStore, assistants: &Assistants, text: Vec<String>) {
    let input = text.join(" ");
    if input.trim().is_empty() {
        eprintln!("Describe the task first.");
        std::process::exit(2);
    }
    eprintln!("Analyzing task...");
    let draft = parse_or_fallback(assistants.parser.as_ref(), &input);
    let id = store.create(draft);
    report_persist_error(store);
    if let Some(task) = store.get(&id) {
        print_task(task);
    }
}

/// List the projected tasks followed by a stats footer.
pub fn cmd_list(store: &TaskStore, filter: Filter, search: Option<String>, limit: Option<usize>) {
    let search = search.unwrap_or_default();
    let mut view = project(store.tasks(), filter, &search);
    if let Some(n) = limit {
        view.tasks.truncate(n);
    }
    if store.is_empty() {
        println!("All quiet. Time to plan something great!");
    } else if view.tasks.is_empty() {
        if search.is_empty() {
            println!("No {} tasks.", filter_label(filter));
        } else {
            println!("Nothing found for '{}'.", search);
        }
    } else {
        print_table(&view.tasks);
    }
    println!();
    print_stats(&view.stats);
}

/// View detailed information about a specific task.
pub fn cmd_view(store: &TaskStore, identifier: String) {
    let Some(id) = resolve_or_report(store, &identifier) else {
        return;
    };
    if let Some(task) = store.get(&id) {
        print_task(task);
    }
}

/// Flip completion of a task.
pub fn cmd_toggle(store: &mut TaskStore, identifier: String) {
    let Some(id) = resolve_or_report(store, &identifier) else {
        return;
    };
    store.toggle_completion(&id);
    report_persist_error(store);
    if let Some(task) = store.get(&id) {
        let state = if task.completed { "done" } else { "open" };
        println!("{} {} is {}.", task.short_id(), task.title, state);
    }
}

/// Delete a task and everything it owns.
pub fn cmd_delete(store: &mut TaskStore, identifier: String) {
    let Some(id) = resolve_or_report(store, &identifier) else {
        return;
    };
    let title = store.get(&id).map(|t| t.title.clone()).unwrap_or_default();
    store.delete(&id);
    report_persist_error(store);
    println!("Deleted '{}'.", title);
}

/// Subtask management.
pub fn cmd_subtask(store: &mut TaskStore, action: SubtaskAction) {
    match action {
        SubtaskAction::Add { task, titles } => {
            let titles: Vec<String> = titles
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if titles.is_empty() {
                eprintln!("Subtask title cannot be empty.");
                std::process::exit(2);
            }
            let Some(id) = resolve_or_report(store, &task) else {
                return;
            };
            store.append_subtasks(&id, &titles);
            report_persist_error(store);
            println!("Added {} subtask(s).", titles.len());
        }
        SubtaskAction::Toggle { task, subtask } => {
            let Some(id) = resolve_or_report(store, &task) else {
                return;
            };
            let Some(sub_id) = store.resolve_subtask(&id, &subtask) else {
                tracing::debug!(subtask = %subtask, "no subtask matches");
                println!("No changes.");
                return;
            };
            store.toggle_subtask_completion(&id, &sub_id);
            report_persist_error(store);
            if let Some(task) = store.get(&id) {
                let (done, total) = task.subtask_progress();
                println!("Subtasks of '{}': {}/{} done.", task.title, done, total);
            }
        }
    }
}

/// Generate subtasks with the assistant and append them.
pub fn cmd_breakdown(store: &mut TaskStore, assistants: &Assistants, identifier: String) {
    let Some(id) = resolve_or_report(store, &identifier) else {
        return;
    };
    let Some(task) = store.get(&id) else {
        return;
    };
    eprintln!("Generating subtasks...");
    let titles = subtasks_or_empty(assistants.generator.as_ref(), task);
    store.append_subtasks(&id, &titles);
    report_persist_error(store);
    if titles.is_empty() {
        println!("No subtasks suggested.");
    } else {
        for title in &titles {
            println!("  + {}", title);
        }
    }
}

/// Show counters for the whole collection.
pub fn cmd_stats(store: &TaskStore) {
    print_stats(&TaskStats::compute(store.tasks()));
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Format a priority level for display.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::High => "High",
        Priority::Medium => "Medium",
        Priority::Low => "Low",
    }
}

fn filter_label(filter: Filter) -> &'static str {
    match filter {
        Filter::All => "matching",
        Filter::Active => "active",
        Filter::Completed => "completed",
    }
}

/// Format subtask progress as "done/total", or "-" without subtasks.
pub fn format_progress(task: &Task) -> String {
    match task.subtask_progress() {
        (_, 0) => "-".into(),
        (done, total) => format!("{}/{}", done, total),
    }
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[&Task]) {
    println!(
        "{:<8} {:<4} {:<7} {:<12} {:<5} {}",
        "ID", "Done", "Pri", "Due", "Sub", "Title"
    );
    let now = Local::now().naive_local();
    for t in tasks {
        let due = format_due_relative(t.due_date, now);
        let due = if t.is_overdue(now) { format!("!{}", due) } else { due };
        println!(
            "{:<8} {:<4} {:<7} {:<12} {:<5} {}",
            t.short_id(),
            if t.completed { "[x]" } else { "[ ]" },
            format_priority(t.priority),
            truncate(&due, 12),
            format_progress(t),
            t.title
        );
    }
}

fn print_task(task: &Task) {
    println!("{} {}", if task.completed { "[x]" } else { "[ ]" }, task.title);
    println!("  id:        {}", task.id);
    if let Some(desc) = task.description.as_deref().filter(|d| !d.is_empty()) {
        println!("  details:   {}", desc);
    }
    println!("  priority:  {}", format_priority(task.priority));
    if let Some(due) = task.due_date {
        let now = Local::now().naive_local();
        let late = if task.is_overdue(now) { " (overdue)" } else { "" };
        println!("  due:       {}{}", format_due_absolute(due), late);
    }
    if !task.subtasks.is_empty() {
        println!("  subtasks:  {} ({}%)", format_progress(task), task.subtask_percent());
        for (i, s) in task.subtasks.iter().enumerate() {
            println!(
                "    {}. {} {}  ({})",
                i + 1,
                if s.completed { "[x]" } else { "[ ]" },
                s.title,
                s.short_id()
            );
        }
    }
}

fn print_stats(stats: &TaskStats) {
    println!(
        "Active: {}  Done: {}  Total: {}  Completion: {}%",
        stats.active, stats.completed, stats.total, stats.completion_rate
    );
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::{assistants, StubAssistant};
    use crate::celebrate::Quiet;
    use crate::storage::MemoryStorage;

    fn store() -> TaskStore {
        TaskStore::open(Box::new(MemoryStorage::new()), Box::new(Quiet))
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer title", 6), "a lon…");
        assert_eq!(truncate("отчет по продажам", 6), "отчет…");
    }

    #[test]
    fn test_cmd_add_trims_and_creates() {
        let mut store = store();
        cmd_add(&mut store, "  Write report ".into(), Some(" ".into()), Priority::High, Some("2024-05-01".into()));
        let task = &store.tasks()[0];
        assert_eq!(task.title, "Write report");
        assert_eq!(task.description, None);
        assert_eq!(task.priority, Priority::High);
        assert!(task.due_date.is_some());
    }

    #[test]
    fn test_cmd_smart_add_falls_back() {
        let mut store = store();
        let ai = assistants(StubAssistant::failing(), StubAssistant::failing());
        cmd_smart_add(&mut store, &ai, vec!["buy".into(), "milk".into()]);
        let task = &store.tasks()[0];
        assert_eq!(task.title, "buy milk");
        assert_eq!(task.description.as_deref(), Some(""));
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn test_cmd_breakdown_appends() {
        let mut store = store();
        let id = store.create(TaskDraft { title: "Plan trip".into(), ..Default::default() });
        let ai = assistants(StubAssistant::failing(), StubAssistant::with_subtasks(&["Book", "Pack"]));
        cmd_breakdown(&mut store, &ai, "plan trip".into());
        cmd_breakdown(&mut store, &ai, "nothing like it".into());
        let titles: Vec<_> = store.get(&id).unwrap().subtasks.iter().map(|s| s.title.clone()).collect();
        assert_eq!(titles, ["Book", "Pack"]);

        let failing = assistants(StubAssistant::failing(), StubAssistant::failing());
        cmd_breakdown(&mut store, &failing, id.clone());
        assert_eq!(store.get(&id).unwrap().subtasks.len(), 2);
    }

    #[test]
    fn test_cmd_subtask_and_toggle() {
        let mut store = store();
        let id = store.create(TaskDraft { title: "Report".into(), ..Default::default() });
        cmd_subtask(&mut store, SubtaskAction::Add { task: id.clone(), titles: vec!["a".into(), "b".into()] });
        cmd_subtask(&mut store, SubtaskAction::Toggle { task: "report".into(), subtask: "2".into() });
        let task = store.get(&id).unwrap();
        assert_eq!(task.subtask_progress(), (1, 2));
        assert!(task.subtasks[1].completed);

        cmd_toggle(&mut store, id[..8].to_string());
        assert!(store.get(&id).unwrap().completed);
        cmd_delete(&mut store, "Report".into());
        assert!(store.is_empty());
        cmd_delete(&mut store, "Report".into());
        assert!(store.is_empty());
    }
}
