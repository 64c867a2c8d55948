//! # Logging Utilities
//!
//! Logging infrastructure for Tether using `tracing`.
//!
//! The core library only emits events; binaries, demos and tests choose how
//! they are rendered by calling one of the initializers below once.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tether_utils::init_logging;
//!
//! // Reads RUST_LOG, TETHER_LOG_FORMAT, TETHER_LOG_LEVEL and TETHER_LOG_FILE
//! init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Device bridge ready");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Filter directives (e.g. `RUST_LOG=tether_core=trace`); wins over everything else
//! - `TETHER_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `TETHER_LOG_LEVEL`: Default level when `RUST_LOG` is unset (default: `info`)
//! - `TETHER_LOG_FILE`: Optional path to log file (if not set, logs only to console)

use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{ConfigError, Settings};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default for development)
    Pretty,
    /// JSON format (default for production)
    Json,
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (every operation phase transition)
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
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

/// Initialize logging from the environment
///
/// Equivalent to loading [`Settings::from_env`] and passing it to
/// [`init_logging_from_settings`].
///
/// ## Errors
///
/// Returns an error if:
/// - A `TETHER_LOG_*` variable holds an invalid value
/// - Logging is already initialized
/// - File logging fails (if `TETHER_LOG_FILE` is set)
pub fn init_logging() -> Result<(), LoggingError>
{
    let settings = Settings::from_env()?;
    init_logging_from_settings(&settings)
}

/// Initialize logging from already-loaded settings
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging_from_settings(settings: &Settings) -> Result<(), LoggingError>
{
    init_logging_internal(settings.log_format, settings.log_level.into(), settings.log_file.as_deref())
}

/// Initialize console logging with explicit level and format
///
/// ## Example
///
/// ```rust,no_run
/// use tether_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<(), LoggingError>
{
    init_logging_internal(format, level.into(), None)
}

/// Initialize file-only logging (nothing is written to stdout)
///
/// Useful for embedding hosts whose stdout is a protocol channel.
/// `level` overrides `RUST_LOG` when given.
///
/// ## Errors
///
/// Returns an error if logging is already initialized or the log directory
/// cannot be created.
pub fn init_logging_to_file(path: &Path, level: Option<LogLevel>) -> Result<PathBuf, LoggingError>
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    // Priority: explicit level, then RUST_LOG, then INFO
    let filter = match level {
        Some(level) => EnvFilter::new(Level::from(level).to_string()),
        None => default_filter(Level::INFO),
    };

    Registry::default()
        .with(file_layer(LogFormat::Pretty, path, false, filter))
        .try_init()
        .map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;

    Ok(path.to_path_buf())
}

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// `RUST_LOG` when set and valid, `level` otherwise.
fn default_filter(level: Level) -> EnvFilter
{
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

/// Stdout layer. Pretty output carries source locations and colour.
fn console_layer<S>(format: LogFormat, filter: EnvFilter) -> BoxedLayer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = fmt::layer()
        .with_writer(io::stdout)
        .with_timer(ChronoUtc::rfc_3339())
        .with_thread_names(true)
        .with_target(true);

    match format {
        LogFormat::Pretty => layer
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

/// Layer writing to `path` without ANSI escapes, optionally rotated daily.
fn file_layer<S>(format: LogFormat, path: &Path, rolling_daily: bool, filter: EnvFilter) -> BoxedLayer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = fmt::layer()
        .with_writer(file_writer(path, rolling_daily))
        .with_timer(ChronoUtc::rfc_3339())
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_ansi(false);

    match format {
        LogFormat::Pretty => layer.with_filter(filter).boxed(),
        LogFormat::Json => layer.json().with_current_span(true).with_filter(filter).boxed(),
    }
}

/// Build a non-blocking writer for `path`
///
/// The worker guard is leaked so buffered lines keep flushing for the
/// lifetime of the process.
fn file_writer(path: &Path, rolling_daily: bool) -> NonBlocking
{
    let directory = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().unwrap_or_default();
    let appender = if rolling_daily {
        tracing_appender::rolling::daily(directory, file_name)
    } else {
        tracing_appender::rolling::never(directory, file_name)
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    std::mem::forget(guard);
    non_blocking
}

fn init_logging_internal(format: LogFormat, default_level: Level, log_file: Option<&Path>) -> Result<(), LoggingError>
{
    Registry::default()
        .with(console_layer(format, default_filter(default_level)))
        .with(log_file.map(|path| file_layer(format, path, true, default_filter(default_level))))
        .try_init()
        .map_err(|e| LoggingError::InitializationFailed(e.to_string()))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Settings could not be read from the environment
    #[error("Invalid logging configuration: {0}")]
    Config(#[from] ConfigError),

    /// Failed to initialize logging (usually: a subscriber is already installed)
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
