use std::path::PathBuf;

use clap::Parser;

use crate::ai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::cmd::Commands;

/// Personal task manager with AI-assisted capture.
/// Storage defaults to ~/.smart_tasks/tasks.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "st", version, about = "Personal task manager with AI-assisted capture")]
pub struct Cli {
    /// Path to the JSON task snapshot.
    #[arg(long, global = true, env = "SMART_TASKS_DB")]
    pub db: Option<PathBuf>,

    /// Gemini API key. Without one, assisted features fall back to plain input.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Gemini model used for assisted features.
    #[arg(long, global = true, env = "SMART_TASKS_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the Gemini API.
    #[arg(long, global = true, env = "SMART_TASKS_API_BASE", default_value = DEFAULT_BASE_URL)]
    pub api_base: String,

    /// Timeout in seconds for a single assisted request.
    #[arg(long, global = true, env = "SMART_TASKS_AI_TIMEOUT", default_value_t = 30)]
    pub ai_timeout: u64,

    /// Command to run; launches the interactive UI when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}
