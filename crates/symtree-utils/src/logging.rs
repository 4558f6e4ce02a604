//! # Logging Utilities
//!
//! Logging infrastructure for symtree using `tracing`.
//!
//! Console output always goes to **stderr**: the command-line tools write
//! JSON documents to stdout and log lines must never interleave with them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use symtree_utils::init_logging;
//!
//! // Reads RUST_LOG, SYMTREE_LOG_FORMAT and SYMTREE_LOG_FILE
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("symbolication started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter directives (e.g. `debug`, `symtree_core=trace`)
//! - `SYMTREE_LOG_FORMAT`: `pretty` (default) or `json`
//! - `SYMTREE_LOG_FILE`: optional log destination. A file path is rolled
//!   daily; an existing directory receives `YYYY-MM-DD-symtree.log`.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use symtree_utils::{LogFormat, LogLevel, LoggingConfig, init_logging_with};
//!
//! let config = LoggingConfig::from_env().with_level(LogLevel::Debug).with_format(LogFormat::Json);
//! let _guard = init_logging_with(&config).expect("Failed to initialize logging");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt as subscriber_fmt;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "SYMTREE_LOG_FORMAT";
/// Environment variable selecting an optional log file.
pub const LOG_FILE_ENV: &str = "SYMTREE_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable lines (default)
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "dev" | "development" | "text" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(format!("{s} (use 'pretty' or 'json')"))),
        }
    }
}

impl fmt::Display for LogFormat
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    /// Default when nothing else is configured
    Info,
    Debug,
    /// Includes one event per resolver lookup
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(format!(
                "{s} (use 'error', 'warn', 'info', 'debug', or 'trace')"
            ))),
        }
    }
}

impl fmt::Display for LogLevel
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", Level::from(*self))
    }
}

/// Where log files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFile
{
    /// Daily-rolled file: `<path>.YYYY-MM-DD`
    Rolling(PathBuf),
    /// `<dir>/YYYY-MM-DD-symtree.log`, never rolled
    Dated(PathBuf),
}

impl LogFile
{
    /// Classify a configured path: existing directories get dated files.
    pub fn from_path(path: impl Into<PathBuf>) -> Self
    {
        let path = path.into();
        if path.is_dir() { LogFile::Dated(path) } else { LogFile::Rolling(path) }
    }

    /// Path of the file written today.
    pub fn current_path(&self) -> PathBuf
    {
        let today = Utc::now().format("%Y-%m-%d");
        match self {
            LogFile::Rolling(path) => {
                let mut name = path.file_name().unwrap_or_default().to_os_string();
                name.push(format!(".{today}"));
                path.with_file_name(name)
            }
            LogFile::Dated(dir) => dir.join(format!("{today}-symtree.log")),
        }
    }

    /// Create the log directory and start the background writer.
    fn writer(&self) -> Result<(NonBlocking, WorkerGuard), LoggingError>
    {
        let (dir, prefix, rotation) = match self {
            LogFile::Rolling(path) => (
                path.parent()
                    .filter(|parent| !parent.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new(".")),
                path.file_name().unwrap_or_default().to_string_lossy().into_owned(),
                Rotation::DAILY,
            ),
            LogFile::Dated(dir) => {
                let today = Utc::now().format("%Y-%m-%d");
                (dir.as_path(), format!("{today}-symtree.log"), Rotation::NEVER)
            }
        };

        fs::create_dir_all(dir)?;
        let appender = RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(prefix)
            .build(dir)
            .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

        Ok(tracing_appender::non_blocking(appender))
    }
}

/// Everything needed to install the global subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoggingConfig
{
    /// Explicit level. Overrides `RUST_LOG` when set.
    pub level: Option<LogLevel>,
    pub format: LogFormat,
    pub file: Option<LogFile>,
}

impl LoggingConfig
{
    /// Read `SYMTREE_LOG_FORMAT` and `SYMTREE_LOG_FILE`.
    ///
    /// An unparseable format falls back to pretty output.
    pub fn from_env() -> Self
    {
        Self::from_vars(env::var(LOG_FORMAT_ENV).ok().as_deref(), env::var(LOG_FILE_ENV).ok().as_deref())
    }

    /// Build from raw variable values.
    pub fn from_vars(format: Option<&str>, file: Option<&str>) -> Self
    {
        Self {
            level: None,
            format: format.and_then(|value| value.parse().ok()).unwrap_or_default(),
            file: file.filter(|value| !value.is_empty()).map(LogFile::from_path),
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self
    {
        self.level = Some(level);
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self
    {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: LogFile) -> Self
    {
        self.file = Some(file);
        self
    }

    /// Filter directives in effect.
    ///
    /// Priority: explicit level, then `RUST_LOG`, then `info`.
    pub fn filter_directives(&self) -> String
    {
        match self.level {
            Some(level) => level.to_string(),
            None => env::var(EnvFilter::DEFAULT_ENV)
                .ok()
                .filter(|value| EnvFilter::try_new(value).is_ok())
                .unwrap_or_else(|| Level::INFO.to_string()),
        }
    }

    fn filter(&self) -> EnvFilter
    {
        EnvFilter::try_new(self.filter_directives()).unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
    }
}

/// Keeps the background file writer alive.
///
/// Dropping it flushes and stops file logging; hold it for the life of the
/// program.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug)]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging from the environment
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    init_logging_with(&LoggingConfig::from_env())
}

/// Initialize logging with explicit level and format
///
/// The log file, if any, still comes from `SYMTREE_LOG_FILE`.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_logging_with(&LoggingConfig::from_env().with_level(level).with_format(format))
}

/// Initialize logging from a [`LoggingConfig`]
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging_with(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError>
{
    let mut layers: Vec<BoxedLayer> = vec![console_layer(config.format, config.filter())];

    let guard = match &config.file {
        Some(file) => {
            let (writer, guard) = file.writer()?;
            layers.push(file_layer(config.format, writer, config.filter()));
            Some(guard)
        }
        None => None,
    };

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}

fn console_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer
{
    match format {
        LogFormat::Pretty => subscriber_fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true)
            .with_writer(io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => subscriber_fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stderr)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(format: LogFormat, writer: NonBlocking, filter: EnvFilter) -> BoxedLayer
{
    match format {
        LogFormat::Pretty => subscriber_fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false) // No ANSI in files
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => subscriber_fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// The log directory could not be created
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
