use thiserror::Error;

/// Error raised while the service bootstraps: loading settings, opening
/// storage, binding the listener
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Settings could not be loaded or are inconsistent
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Storage backend could not be opened or initialised
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Listener or HTTP server failures, carrying their `anyhow` context
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for bootstrap operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Log a bootstrap failure with its context
pub fn log_error(context: &str, error: &ServiceError) {
    tracing::error!(
        context = context,
        error = %error,
        "Confman startup error"
    );
}
