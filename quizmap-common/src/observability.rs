//! `tracing` setup for quizmap binaries.
//!
//! Every run logs into one rolling file per day. Call [`init_logging`] early
//! in `main`; repeat calls do nothing and return the same path.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Overrides the log directory when the config leaves it unset.
pub const LOG_DIR_ENV: &str = "QUIZMAP_LOG_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Settings for [`init_logging`], usually built from the `logging` section
/// of the config file.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Names the log file and the fallback data directory.
    pub app_name: &'static str,
    /// Log directory; `~/` is expanded. Falls back to `QUIZMAP_LOG_DIR`,
    /// then to the platform data dir.
    pub log_dir: Option<PathBuf>,
    /// Also write events to stderr.
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// `EnvFilter` directives used when `RUST_LOG` is not set.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "quizmap",
            log_dir: None,
            emit_stderr: true,
            format: LogFormat::default(),
            default_filter: "info".into(),
        }
    }
}

/// Install the global subscriber: a daily rolling file plus an optional
/// stderr copy, both in the configured format.
///
/// Returns today's log file. Only the first call installs anything; later
/// calls return the path resolved by the first.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(existing) = LOG_PATH.get() {
        return Ok(existing.clone());
    }

    let dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let file_name = format!("{}.log", config.app_name);
    let log_path = dir.join(format!("{file_name}.{}", Local::now().format("%Y-%m-%d")));

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &file_name));
    let _ = LOG_GUARD.set(guard);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let json = config.format == LogFormat::Json;
    let (text_file, json_file) = if json {
        (None, Some(fmt::layer().json().with_writer(file_writer)))
    } else {
        (Some(fmt::layer().with_ansi(false).with_writer(file_writer)), None)
    };
    let text_stderr = (config.emit_stderr && !json)
        .then(|| fmt::layer().with_writer(std::io::stderr));
    let json_stderr = (config.emit_stderr && json)
        .then(|| fmt::layer().json().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(text_file)
        .with(json_file)
        .with(text_stderr)
        .with(json_stderr)
        .try_init()
        .context("tracing subscriber already installed")?;

    let _ = LOG_PATH.set(log_path.clone());
    tracing::debug!(
        path = %log_path.display(),
        format = ?config.format,
        stderr = config.emit_stderr,
        "logging initialised"
    );
    Ok(log_path)
}

fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(dir) => expand_home(dir),
        None => std::env::var_os(LOG_DIR_ENV)
            .map(|dir| expand_home(Path::new(&dir)))
            .unwrap_or_else(|| default_data_dir(app_name)),
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn default_data_dir(app_name: &str) -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(app_name)
}
