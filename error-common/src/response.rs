use crate::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// A single schema rule violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Dotted path of the offending field, `(root)` for the whole document
    pub field: String,
    /// Human-readable reason the value was rejected
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Standard JSON error body returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Stable error code
    pub code: ErrorCode,
    /// Extra detail: violation list, resource id or error id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            error: message.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach schema violations as the details array
    pub fn with_violations(self, violations: Vec<FieldViolation>) -> Self {
        let details = serde_json::to_value(violations).unwrap_or(serde_json::Value::Null);
        self.with_details(details)
    }
}
