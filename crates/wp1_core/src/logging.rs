//! File logging for reconciliation workers.
//!
//! Each worker process writes its own file set under the log directory,
//! `wp1_<worker>_r<timestamp>.log`, rotated daily or at the size cap,
//! whichever comes first. Warnings and errors are also echoed to stderr so
//! a cron mail or a terminal run shows them without opening the files.
//!
//! # Invariants
//! - The first successful [`init_logging`] call wins for the whole
//!   process; later calls are no-ops.
//! - Initialization reports failures as [`LoggingError`] and never panics.
//! - Panic payloads are logged on one line.

use flexi_logger::{
    Age, Cleanup, Criterion, Duplicate, FileSpec, FlexiLoggerError, LogSpecification, Logger,
    LoggerHandle, Naming, WriteMode,
};
use log::{debug, error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const LOG_DIR_VAR: &str = "WP1_LOG_DIR";
pub const LOG_LEVEL_VAR: &str = "WP1_LOG_LEVEL";
pub const WORKER_VAR: &str = "WP1_WORKER";

const LOG_FILE_BASENAME: &str = "wp1";
const DEFAULT_WORKER: &str = "worker";
const MAX_LOG_FILE_BYTES: u64 = 50 * 1024 * 1024;
/// Two weeks of daily rotations.
const RETAINED_LOG_FILES: usize = 14;
const MAX_PANIC_PAYLOAD_CHARS: usize = 240;

static LOGGER: OnceCell<LoggerHandle> = OnceCell::new();

#[derive(Debug)]
pub enum LoggingError {
    InvalidLevel(String),
    RelativeDir(PathBuf),
    InvalidWorker(String),
    CreateDir { dir: PathBuf, source: std::io::Error },
    Backend(FlexiLoggerError),
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLevel(level) => write!(
                f,
                "unknown log level `{level}` (use off, error, warn, info, debug or trace)"
            ),
            Self::RelativeDir(dir) => {
                write!(f, "log directory `{}` must be absolute", dir.display())
            }
            Self::InvalidWorker(name) => write!(
                f,
                "worker name `{name}` must be non-empty ASCII letters, digits, `-` or `_`"
            ),
            Self::CreateDir { dir, source } => {
                write!(f, "cannot create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "cannot start file logger: {err}"),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            Self::InvalidLevel(_) | Self::RelativeDir(_) | Self::InvalidWorker(_) => None,
        }
    }
}

impl From<FlexiLoggerError> for LoggingError {
    fn from(value: FlexiLoggerError) -> Self {
        Self::Backend(value)
    }
}

/// Where and how verbosely one worker process logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub dir: PathBuf,
    pub level: LevelFilter,
    /// Distinguishes concurrent workers sharing one log directory.
    pub worker: String,
}

impl LogSettings {
    pub fn new(dir: impl Into<PathBuf>, worker: &str) -> Result<Self, LoggingError> {
        let dir = dir.into();
        if !dir.is_absolute() {
            return Err(LoggingError::RelativeDir(dir));
        }
        let worker_ok = !worker.is_empty()
            && worker
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !worker_ok {
            return Err(LoggingError::InvalidWorker(worker.to_string()));
        }
        Ok(Self {
            dir,
            level: default_level(),
            worker: worker.to_string(),
        })
    }

    pub fn with_level(mut self, level: &str) -> Result<Self, LoggingError> {
        self.level = level
            .trim()
            .parse()
            .map_err(|_| LoggingError::InvalidLevel(level.trim().to_string()))?;
        Ok(self)
    }

    /// Reads `WP1_LOG_DIR`, `WP1_LOG_LEVEL` and `WP1_WORKER`.
    ///
    /// Returns `Ok(None)` when no log directory is configured.
    pub fn from_env() -> Result<Option<Self>, LoggingError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, LoggingError> {
        let Some(dir) = var(LOG_DIR_VAR).filter(|dir| !dir.trim().is_empty()) else {
            return Ok(None);
        };
        let worker = var(WORKER_VAR).unwrap_or_else(|| DEFAULT_WORKER.to_string());
        let settings = Self::new(Path::new(dir.trim()), worker.trim())?;
        match var(LOG_LEVEL_VAR) {
            Some(level) => settings.with_level(&level).map(Some),
            None => Ok(Some(settings)),
        }
    }
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Starts file logging for this process.
///
/// Returns `Ok(true)` when this call started the logger and `Ok(false)` when
/// a logger was already running, in which case `settings` are ignored.
pub fn init_logging(settings: &LogSettings) -> Result<bool, LoggingError> {
    let mut started = false;
    LOGGER.get_or_try_init(|| {
        let handle = start_logger(settings)?;
        started = true;
        Ok::<_, LoggingError>(handle)
    })?;

    if started {
        install_panic_hook(settings.worker.clone());
        info!(
            "event=worker_start module=core status=ok worker={} version={} level={} log_dir={}",
            settings.worker,
            env!("CARGO_PKG_VERSION"),
            settings.level,
            settings.dir.display()
        );
    } else {
        debug!(
            "event=logging_init module=core status=skipped reason=already_running worker={}",
            settings.worker
        );
    }
    Ok(started)
}

fn start_logger(settings: &LogSettings) -> Result<LoggerHandle, LoggingError> {
    std::fs::create_dir_all(&settings.dir).map_err(|source| LoggingError::CreateDir {
        dir: settings.dir.clone(),
        source,
    })?;

    let handle = Logger::with(LogSpecification::builder().default(settings.level).build())
        .log_to_file(
            FileSpec::default()
                .directory(&settings.dir)
                .basename(LOG_FILE_BASENAME)
                .discriminant(&settings.worker),
        )
        .rotate(
            Criterion::AgeOrSize(Age::Day, MAX_LOG_FILE_BYTES),
            Naming::Timestamps,
            Cleanup::KeepLogFiles(RETAINED_LOG_FILES),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()?;
    Ok(handle)
}

fn install_panic_hook(worker: String) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<non-string payload>".to_string());
        error!(
            "event=panic_captured module=core status=error worker={worker} location={location} payload={}",
            one_line(&payload, MAX_PANIC_PAYLOAD_CHARS)
        );
        previous(info);
    }));
}

/// Collapses line breaks and caps the length.
fn one_line(text: &str, max_chars: usize) -> String {
    let mut flat: String = text
        .split(['\n', '\r'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");
    if let Some((cut, _)) = flat.char_indices().nth(max_chars) {
        flat.truncate(cut);
        flat.push_str("...");
    }
    flat
}
