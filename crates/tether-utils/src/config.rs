//! # Configuration
//!
//! Runtime settings for Tether, read from `TETHER_*` environment variables.
//!
//! | Variable                   | Meaning                               | Default        |
//! |----------------------------|---------------------------------------|----------------|
//! | `TETHER_LOG_FORMAT`        | `pretty` or `json`                    | `pretty`       |
//! | `TETHER_LOG_LEVEL`         | `error` .. `trace`                    | `info`         |
//! | `TETHER_LOG_FILE`          | Optional log file path                | unset          |
//! | `TETHER_ENGINE_LATENCY_MS` | Artificial latency of the simulated engine | `0`       |
//! | `TETHER_DEVICE_NAME`       | Name reported by the simulated device | `Local System` |
//!
//! `RUST_LOG`, when set, still takes precedence over `TETHER_LOG_LEVEL` for
//! filtering (see [`crate::logging`]).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::logging::{LogFormat, LogLevel};

/// Default device name reported by the simulated engine.
pub const DEFAULT_DEVICE_NAME: &str = "Local System";

/// Settings shared by binaries, demos and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings
{
    /// Output format of the log subscriber
    pub log_format: LogFormat,
    /// Default log level when `RUST_LOG` is not set
    pub log_level: LogLevel,
    /// Optional file that receives a copy of every log line
    pub log_file: Option<PathBuf>,
    /// Delay the simulated engine waits before completing each call
    pub engine_latency: Duration,
    /// Human-readable name of the simulated device
    pub device_name: String,
}

impl Default for Settings
{
    fn default() -> Self
    {
        Self {
            log_format: LogFormat::Pretty,
            log_level: LogLevel::Info,
            log_file: None,
            engine_latency: Duration::ZERO,
            device_name: DEFAULT_DEVICE_NAME.to_string(),
        }
    }
}

impl Settings
{
    /// Load settings from the process environment.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first variable whose value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError>
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// Unset or empty variables keep their defaults.
    ///
    /// ## Errors
    ///
    /// Same as [`Settings::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut settings = Self::default();

        if let Some(value) = get("TETHER_LOG_FORMAT") {
            settings.log_format = parse_var("TETHER_LOG_FORMAT", &value)?;
        }
        if let Some(value) = get("TETHER_LOG_LEVEL") {
            settings.log_level = parse_var("TETHER_LOG_LEVEL", &value)?;
        }
        if let Some(value) = get("TETHER_LOG_FILE") {
            settings.log_file = Some(PathBuf::from(value));
        }
        if let Some(value) = get("TETHER_ENGINE_LATENCY_MS") {
            let millis: u64 = value.trim().parse().map_err(|_| ConfigError::Invalid {
                variable: "TETHER_ENGINE_LATENCY_MS",
                reason: format!("expected a whole number of milliseconds, got '{value}'"),
            })?;
            settings.engine_latency = Duration::from_millis(millis);
        }
        if let Some(value) = get("TETHER_DEVICE_NAME") {
            settings.device_name = value;
        }

        Ok(settings)
    }
}

fn parse_var<T>(variable: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr<Err = String>,
{
    value.trim().parse().map_err(|reason| ConfigError::Invalid { variable, reason })
}

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError
{
    /// An environment variable holds a value that cannot be parsed
    #[error("Invalid value for {variable}: {reason}")]
    Invalid
    {
        /// Name of the offending variable
        variable: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}
