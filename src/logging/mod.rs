
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::errors::{Error, Result};

pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Env-filter directive used when `RUST_LOG` is unset.
    pub level: String,
    pub file_logging_enabled: bool,
    pub log_dir: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file_logging_enabled: true,
            log_dir: PathBuf::from("logs"),
        }
    }
}

pub fn build_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| Error::Logging(format!("invalid log level/filter '{level}': {e}")))
}

pub fn session_log_path(dir: &Path, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("session-{}.log", now.format("%Y%m%d-%H%M%S")))
}

fn open_session_file(dir: &Path) -> io::Result<(File, PathBuf)> {
    fs::create_dir_all(dir)?;
    let path = session_log_path(dir, Local::now());
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

/// Installs the global subscriber: compact lines on stderr plus, when enabled,
/// a session log file. Returns the log file path if one was opened.
///
/// A log directory that cannot be created only costs the file layer.
pub fn init(settings: &LogSettings) -> Result<Option<PathBuf>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&settings.level)?,
    };

    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    let mut file_error = None;
    let (file_layer, log_path) = if settings.file_logging_enabled {
        match open_session_file(&settings.log_dir) {
            Ok((file, path)) => (
                Some(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(false),
                ),
                Some(path),
            ),
            Err(err) => {
                file_error = Some(err);
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    if let Some(err) = file_error {
        warn!(
            dir = %settings.log_dir.display(),
            error = %err,
            "file logging unavailable, continuing without a log file"
        );
    }
    Ok(log_path)
}
