//! Common error handling utilities for Confman
//!
//! This crate holds the pieces of error handling that every other crate in the
//! workspace agrees on:
//!
//! - **Error Codes**: the stable, machine-readable codes returned to API clients
//! - **Field Violations**: one entry per failed schema rule, carrying a field path
//!   and a human-readable reason
//! - **Error Bodies**: the JSON shape every failed request answers with
//! - **Sanitization**: stripping storage diagnostics from messages that leave
//!   the process
//! - **Bootstrap Errors**: `ServiceError`, used while the process is wiring
//!   itself together
//!
//! # Example
//!
//! ```rust
//! use error_common::{ErrorCode, ErrorResponse, FieldViolation};
//!
//! let body = ErrorResponse::new("JSON validation failed", ErrorCode::ValidationFailed)
//!     .with_violations(vec![FieldViolation::new("max_limit", "Invalid type. Expected: integer")]);
//!
//! assert_eq!(body.code, ErrorCode::ValidationFailed);
//! assert_eq!(ErrorCode::ValidationFailed.as_str(), "VALIDATION_FAILED");
//! ```

pub mod codes;
pub mod response;
pub mod sanitization;
pub mod types;

pub use codes::*;
pub use response::*;
pub use sanitization::*;
pub use types::*;
