//! # Tether Utilities
//!
//! Shared logging and configuration for the Tether workspace.
//!
//! Logging is built on `tracing`; configuration is read from `TETHER_*`
//! environment variables.

pub mod config;
pub mod logging;

pub use config::{ConfigError, Settings};
pub use logging::{
    init_logging, init_logging_from_settings, init_logging_to_file, init_logging_with_level, LogFormat, LogLevel, LoggingError,
};
pub use tracing::{debug, error, info, trace, warn};
