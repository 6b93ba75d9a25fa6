//! Logging setup for applications embedding the broker service
//!
//! The library itself only emits `tracing` events. Hosts that do not install
//! their own subscriber can call one of the functions here once at startup.

use std::str::FromStr;

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Environment variable selecting the [`LoggingMode`]
pub const LOG_MODE_ENV: &str = "BROKER_LOG_MODE";

/// Environment variable overriding the filter directives
pub const LOG_LEVEL_ENV: &str = "BROKER_LOG_LEVEL";

/// Where and how log events are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingMode {
    /// No subscriber is installed
    #[default]
    Silent,
    /// Compact stderr output at `info`
    Development,
    /// Pretty output with thread ids and source locations at `debug`
    Debug,
    /// One JSON object per event, for log shippers
    Json,
}

impl FromStr for LoggingMode {
    type Err = LoggingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "silent" | "" => Ok(Self::Silent),
            "development" => Ok(Self::Development),
            "debug" => Ok(Self::Debug),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::InvalidEnv(format!(
                "{LOG_MODE_ENV}={other} (expected silent, development, debug or json)"
            ))),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),
}

/// Install a global subscriber for `mode`
///
/// Fails if another global subscriber is already installed.
///
/// ```rust,ignore
/// broker_registry::logging::init_logging(LoggingMode::Development)?;
/// ```
///
/// `BROKER_LOG_LEVEL` takes precedence over `RUST_LOG`; both accept
/// `EnvFilter` directives such as `broker_registry=debug`.
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => Registry::default()
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            )
            .with(create_env_filter("info"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
        LoggingMode::Debug => Registry::default()
            .with(
                fmt::layer()
                    .pretty()
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(create_env_filter("debug"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
        LoggingMode::Json => Registry::default()
            .with(fmt::layer().json().with_current_span(false))
            .with(create_env_filter("info"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
    }
}

/// Install a subscriber chosen by `BROKER_LOG_MODE`
///
/// An unset variable means [`LoggingMode::Silent`]; an unrecognized value is
/// an error.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = match std::env::var(LOG_MODE_ENV) {
        Ok(value) => value.parse()?,
        Err(std::env::VarError::NotPresent) => LoggingMode::Silent,
        Err(e) => return Err(LoggingError::InvalidEnv(format!("{LOG_MODE_ENV}: {e}"))),
    };

    init_logging(mode)
}

fn create_env_filter(default_level: &str) -> EnvFilter {
    if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
        EnvFilter::new(level)
    } else if let Ok(rust_log) = std::env::var("RUST_LOG") {
        EnvFilter::new(rust_log)
    } else {
        EnvFilter::new(default_level)
    }
}

/// Whether a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

pub fn init_silent() -> Result<(), LoggingError> {
    init_logging(LoggingMode::Silent)
}
