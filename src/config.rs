//! Runtime configuration resolved from command-line flags and the environment.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai::GeminiConfig;
use crate::cli::Cli;
use crate::storage::STORAGE_KEY;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "SMART_TASKS_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";
const DATA_DIR_NAME: &str = ".smart_tasks";

#[derive(Debug, Clone)]
pub struct Config {
    /// Snapshot file.
    pub db_path: PathBuf,
    /// Log file used while the TUI owns the terminal.
    pub log_path: PathBuf,
    pub gemini: GeminiConfig,
}

impl Config {
    /// Resolve paths and service settings. Touches nothing on disk.
    pub fn from_cli(cli: &Cli) -> Self {
        let db_path = match cli.db.as_ref() {
            Some(path) => path.clone(),
            None => default_data_dir().join(format!("{}.json", STORAGE_KEY)),
        };
        let data_dir = db_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        Config {
            db_path,
            log_path: data_dir.join("smart_tasks.log"),
            gemini: GeminiConfig {
                api_key: cli.api_key.clone().filter(|k| !k.trim().is_empty()),
                model: cli.model.clone(),
                base_url: cli.api_base.clone(),
                timeout: Duration::from_secs(cli.ai_timeout.max(1)),
            },
        }
    }

    /// Create the directory holding the snapshot and the log file.
    pub fn ensure_data_dir(&self) -> io::Result<()> {
        match self.log_path.parent() {
            Some(dir) => std::fs::create_dir_all(dir),
            None => Ok(()),
        }
    }
}

/// `$HOME/.smart_tasks`, or `./.smart_tasks` when `HOME` is unset.
pub fn default_data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(DATA_DIR_NAME)
}

/// Where log lines go.
pub enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
}

/// Install the global tracing subscriber.
pub fn init_logging(target: LogTarget) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    let result = match target {
        LogTarget::Stderr => registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr).with_target(false))
            .try_init(),
        LogTarget::File(path) => match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false),
                )
                .try_init(),
            // Never fall back to the terminal the TUI is drawing on.
            Err(_) => registry
                .with(tracing_subscriber::fmt::layer().with_writer(io::sink))
                .try_init(),
        },
    };
    if let Err(e) = result {
        eprintln!("Failed to initialise logging: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_config_from_flags() {
        let dir = std::env::temp_dir().join(format!("smart_tasks_cfg_{}", uuid::Uuid::new_v4()));
        let db = dir.join("mine.json");
        let cli = Cli::try_parse_from([
            "st",
            "--db",
            db.to_str().unwrap(),
            "--api-key",
            "secret",
            "--model",
            "gemini-test",
            "--ai-timeout",
            "5",
            "list",
        ])
        .unwrap();

        let config = Config::from_cli(&cli);
        assert_eq!(config.db_path, db);
        assert_eq!(config.log_path, dir.join("smart_tasks.log"));
        assert!(!dir.exists());
        config.ensure_data_dir().unwrap();
        assert!(dir.is_dir());
        assert_eq!(config.gemini.api_key.as_deref(), Some("secret"));
        assert_eq!(config.gemini.model, "gemini-test");
        assert_eq!(config.gemini.timeout, Duration::from_secs(5));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let dir = std::env::temp_dir().join(format!("smart_tasks_cfg_{}", uuid::Uuid::new_v4()));
        let db = dir.join("tasks.json");
        let cli = Cli::try_parse_from(["st", "--db", db.to_str().unwrap(), "--api-key", " "]).unwrap();
        let config = Config::from_cli(&cli);
        assert_eq!(config.gemini.api_key, None);
        assert!(cli.command.is_none());
    }
}
