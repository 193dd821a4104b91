//! Logging setup for Confman with automatic credential redaction
//!
//! Confman authenticates every API call with a bearer API key, so request
//! metadata that reaches the logs routinely carries credentials. This crate
//! installs the process-wide `tracing` subscriber and provides the
//! [`CredentialRedactor`] used by the HTTP layer to scrub those credentials
//! before anything is written.
//!
//! # Key Features
//!
//! - **Environment Filter**: `RUST_LOG` wins over the configured level
//! - **Console Output**: pretty for terminals, JSON for log shippers
//! - **File Output**: optional daily-rolling JSON files via `tracing-appender`
//! - **Credential Redaction**: bearer tokens, `api_key=` query parameters and
//!   configured keys are replaced by a correlation hash
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init_tracing, LoggerConfig, LogFormat};
//!
//! let config = LoggerConfig {
//!     format: LogFormat::Json,
//!     ..LoggerConfig::default()
//! };
//! let _guard = init_tracing(&config).expect("logging");
//! tracing::info!(name = "payment-config", version = 2, "Configuration updated");
//! ```

pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter directive: {0}")]
    InvalidFilter(String),

    #[error("Global tracing subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

pub type LoggerResult<T> = Result<T, LoggerError>;

/// Keeps the background file writer alive; drop it only at shutdown
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global tracing subscriber described by `config`
///
/// # Errors
///
/// Fails when the configured level is not a valid filter directive or when a
/// global subscriber has already been installed.
pub fn init_tracing(config: &LoggerConfig) -> LoggerResult<LoggingGuard> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.filter_directive())
            .map_err(|e| LoggerError::InvalidFilter(e.to_string()))?,
    };

    let (file_layer, file_guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true)
                    .with_level(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    };
    installed.map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
