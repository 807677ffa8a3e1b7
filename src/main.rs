//! # st - Smart Tasks
//!
//! A personal task manager for the terminal with AI-assisted capture.
//!
//! ## Key Features
//!
//! - **Natural-Language Capture**: Type "sales report by friday, important" and an assistant
//!   fills in title, priority and due date. Without a key or network it keeps your text as-is.
//! - **Subtask Breakdown**: Ask the assistant to split a task into a few concrete steps.
//! - **Focused Listing**: Open tasks first, then by priority, then newest.
//! - **Two Interfaces**: Scriptable CLI plus an interactive TUI with a progress header.
//! - **Local File Storage**: One JSON snapshot, rewritten atomically after each change.
//!
//! ## Quick Start
//!
//! ```bash
//! # Launch the TUI
//! st
//!
//! # Capture a task from free text
//! GEMINI_API_KEY=... st smart-add call the dentist tomorrow at 9, urgent
//!
//! # Add a task explicitly
//! st add "Write quarterly report" --priority high --due "next friday"
//!
//! # List, complete, break down
//! st list --filter all
//! st toggle "Write quarterly report"
//! st breakdown 3f2a
//! ```
//!
//! ## Key Commands
//!
//! - `st ui` - Launch the TUI (default)
//! - `st add <title>` - Create a task with explicit fields
//! - `st smart-add <text>` - Create a task from free text
//! - `st list` - View tasks with status filter and search
//! - `st subtask add|toggle` - Manage subtasks
//! - `st breakdown <task>` - Generate subtasks
//! - `st stats` - Counters and completion rate
//!
//! Data is stored in `~/.smart_tasks/tasks.json` unless `--db` or `SMART_TASKS_DB` says otherwise.
//! Log verbosity follows `SMART_TASKS_LOG` (e.g. `SMART_TASKS_LOG=debug`).

use clap::Parser;

pub mod ai;
pub mod celebrate;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod dates;
pub mod error;
pub mod fields;
pub mod storage;
pub mod store;
pub mod task;
pub mod view;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
    pub mod task_form;
    pub mod utils;
}

use ai::Assistants;
use celebrate::{CelebrationQueue, PrintCheer};
use cli::Cli;
use cmd::*;
use config::{init_logging, Config, LogTarget};
use storage::FileStorage;
use store::TaskStore;

fn main() {
    let cli = Cli::parse();

    let config = Config::from_cli(&cli);
    let command = cli.command.unwrap_or(Commands::Ui);

    if let Commands::Completions { shell } = command {
        cmd_completions(shell);
        return;
    }

    if let Err(e) = config.ensure_data_dir() {
        eprintln!("Failed to prepare data directory: {}", e);
        std::process::exit(1);
    }
    let assistants = Assistants::gemini(config.gemini.clone());
    let storage = Box::new(FileStorage::new(&config.db_path));
    let location = storage.path().display().to_string();

    if let Commands::Ui = command {
        // The terminal belongs to the TUI; logs go to a file instead.
        init_logging(LogTarget::File(&config.log_path));
        let queue = CelebrationQueue::new();
        let store = TaskStore::open(storage, Box::new(queue.clone()));
        tracing::info!(db = %location, tasks = store.len(), "starting TUI");
        if let Err(e) = tui::run::run_tui(store, queue, assistants) {
            eprintln!("TUI error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    init_logging(LogTarget::Stderr);
    let mut store = TaskStore::open(storage, Box::new(PrintCheer));
    tracing::debug!(db = %location, tasks = store.len(), "opened task store");

    match command {
        Commands::Ui | Commands::Completions { .. } => unreachable!("handled above"),

        Commands::Add { title, desc, priority, due } =>
            cmd_add(&mut store, title, desc, priority, due),

        Commands::SmartAdd { text } => cmd_smart_add(&mut store, &assistants, text),

        Commands::List { filter, search, limit } => cmd_list(&store, filter, search, limit),

        Commands::View { task } => cmd_view(&store, task),

        Commands::Toggle { task } => cmd_toggle(&mut store, task),

        Commands::Delete { task } => cmd_delete(&mut store, task),

        Commands::Subtask { action } => cmd_subtask(&mut store, action),

        Commands::Breakdown { task } => cmd_breakdown(&mut store, &assistants, task),

        Commands::Stats => cmd_stats(&store),
    }
}
