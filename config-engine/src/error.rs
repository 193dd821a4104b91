use crate::store::StoreError;
use error_common::{ErrorCode, FieldViolation};
use thiserror::Error;

pub const CONFIGURATION: &str = "Configuration";
pub const CONFIGURATION_VERSION: &str = "Configuration version";
pub const SCHEMA: &str = "Schema";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{resource} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("{resource} already exists")]
    AlreadyExists { resource: &'static str, id: String },

    #[error("{message}")]
    ValidationFailed {
        message: String,
        violations: Vec<FieldViolation>,
    },

    #[error("Invalid JSON Schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Another writer advanced the head first; safe to retry
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConfigError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn already_exists(resource: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource,
            id: id.into(),
        }
    }

    pub fn validation_failed(violations: Vec<FieldViolation>) -> Self {
        Self::ValidationFailed {
            message: "JSON validation failed".to_string(),
            violations,
        }
    }

    /// Classify a storage failure, naming the resource the caller was after
    pub fn from_store(err: StoreError, resource: &'static str, id: impl Into<String>) -> Self {
        match err {
            StoreError::NotFound => Self::not_found(resource, id),
            StoreError::AlreadyExists => Self::already_exists(resource, id),
            StoreError::Conflict(message) => Self::Conflict(message),
            StoreError::Backend(message) => Self::Internal(message),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::NotFound { .. } => ErrorCode::NotFound,
            ConfigError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            ConfigError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            ConfigError::InvalidSchema(_) | ConfigError::InvalidRequest(_) => {
                ErrorCode::InvalidRequest
            }
            ConfigError::Conflict(_) => ErrorCode::Conflict,
            ConfigError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Schema violations carried by a `ValidationFailed` error
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            ConfigError::ValidationFailed { violations, .. } => violations,
            _ => &[],
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::NotFound { .. })
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_keep_their_kind() {
        assert_eq!(
            ConfigError::from_store(StoreError::NotFound, SCHEMA, "app"),
            ConfigError::not_found(SCHEMA, "app")
        );
        assert_eq!(
            ConfigError::from_store(StoreError::AlreadyExists, CONFIGURATION, "app").code(),
            ErrorCode::AlreadyExists
        );
        assert_eq!(
            ConfigError::from_store(StoreError::Conflict("head moved".into()), CONFIGURATION, "app")
                .code(),
            ErrorCode::Conflict
        );
        assert_eq!(
            ConfigError::from_store(StoreError::Backend("disk full".into()), CONFIGURATION, "app"),
            ConfigError::Internal("disk full".into())
        );
    }

    #[test]
    fn test_messages_name_the_resource() {
        assert_eq!(
            ConfigError::not_found(CONFIGURATION_VERSION, "app:7").to_string(),
            "Configuration version not found"
        );
        assert_eq!(
            ConfigError::already_exists(CONFIGURATION, "app").to_string(),
            "Configuration already exists"
        );
    }

    #[test]
    fn test_violations_only_on_validation_failures() {
        let err = ConfigError::validation_failed(vec![FieldViolation::new("(root)", "k is required")]);
        assert_eq!(err.violations().len(), 1);
        assert!(ConfigError::InvalidSchema("bad".into()).violations().is_empty());
    }
}
