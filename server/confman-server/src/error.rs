use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use config_engine::ConfigError;
use error_common::{DataSanitizer, ErrorCode, ErrorResponse};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Errors returned by HTTP handlers and middleware
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] ConfigError),

    #[error("{0}")]
    Unauthorized(String),

    /// The request could not be decoded (body, path or query)
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn bad_request(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self.error_code() {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::AlreadyExists | ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::ValidationFailed | ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            ApiError::Engine(err) => err.code(),
            ApiError::Unauthorized(_) => ErrorCode::Unauthorized,
            ApiError::BadRequest { .. } => ErrorCode::InvalidRequest,
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        match self {
            ApiError::Engine(ConfigError::NotFound { id, .. }) => {
                ErrorResponse::new(self.to_string(), ErrorCode::NotFound)
                    .with_details(json!({ "id": id }))
            }
            ApiError::Engine(ConfigError::AlreadyExists { id, .. }) => {
                ErrorResponse::new(self.to_string(), ErrorCode::AlreadyExists)
                    .with_details(json!({ "id": id }))
            }
            ApiError::Engine(ConfigError::ValidationFailed { message, violations }) => {
                ErrorResponse::new(message.clone(), ErrorCode::ValidationFailed)
                    .with_violations(violations.clone())
            }
            ApiError::Engine(ConfigError::InvalidSchema(reason)) => {
                ErrorResponse::new("Invalid JSON Schema", ErrorCode::InvalidRequest)
                    .with_details(json!(reason))
            }
            ApiError::Engine(ConfigError::InvalidRequest(reason)) => {
                ErrorResponse::new("Invalid request", ErrorCode::InvalidRequest)
                    .with_details(json!(reason))
            }
            ApiError::Engine(ConfigError::Conflict(reason)) => ErrorResponse::new(
                "Configuration was modified concurrently, retry the request",
                ErrorCode::Conflict,
            )
            .with_details(json!({
                "reason": reason,
                "retryable": ErrorCode::Conflict.is_retryable(),
            })),
            ApiError::Engine(ConfigError::Internal(_)) => ErrorResponse::new(
                DataSanitizer::new().public_message(&self.to_string()),
                ErrorCode::InternalError,
            ),
            ApiError::Unauthorized(message) => {
                ErrorResponse::new(message.clone(), ErrorCode::Unauthorized)
            }
            ApiError::BadRequest { message, details } => {
                let response = ErrorResponse::new(message.clone(), ErrorCode::InvalidRequest);
                match details {
                    Some(details) => response.with_details(json!(details)),
                    None => response,
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let mut body = self.to_error_response();

        if status_code.is_server_error() {
            // Log the error with correlation ID; clients only get the ID
            let error_id = Uuid::new_v4().to_string();
            error!(
                error_id = %error_id,
                error_code = %self.error_code(),
                status_code = %status_code.as_u16(),
                error = %DataSanitizer::new().sanitize_for_logging(&self.to_string()),
                "API error occurred"
            );
            body = body.with_details(json!({ "error_id": error_id }));
        } else if status_code == StatusCode::CONFLICT {
            warn!(error_code = %self.error_code(), error = %self, "Request conflicted with current state");
        }

        (status_code, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use config_engine::CONFIGURATION;
    use error_common::FieldViolation;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ConfigError::not_found(CONFIGURATION, "a"), StatusCode::NOT_FOUND),
            (ConfigError::already_exists(CONFIGURATION, "a"), StatusCode::CONFLICT),
            (ConfigError::Conflict("moved".into()), StatusCode::CONFLICT),
            (ConfigError::validation_failed(vec![]), StatusCode::BAD_REQUEST),
            (ConfigError::InvalidSchema("bad".into()), StatusCode::BAD_REQUEST),
            (ConfigError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
            (ConfigError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
        assert_eq!(
            ApiError::unauthorized("Invalid API key").status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_validation_body_lists_violations() {
        let err = ApiError::from(ConfigError::validation_failed(vec![FieldViolation::new(
            "(root)",
            "\"k\" is a required property",
        )]));
        let body = body_json(err.into_response()).await;

        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["error"], "JSON validation failed");
        assert_eq!(body["details"][0]["field"], "(root)");
    }

    #[tokio::test]
    async fn test_internal_errors_are_not_leaked() {
        let err = ApiError::from(ConfigError::Internal(
            "database disk image is malformed at /var/lib/confman".into(),
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("/var/lib/confman"));
        assert!(body["details"]["error_id"].is_string());
    }
}
