use crate::auth::ClientIdentity;
use crate::error::ApiError;
use crate::server::ConfmanServer;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

const BEARER_PREFIX: &str = "Bearer ";

/// Require `Authorization: Bearer <key>` with a configured key
///
/// The resolved [`ClientIdentity`] is attached to the request for handlers
/// and to the response for the audit log.
pub async fn api_key_auth_middleware(
    State(server): State<ConfmanServer>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::unauthorized("API key is required"))?;

    let presented = header_value
        .strip_prefix(BEARER_PREFIX)
        .ok_or_else(|| ApiError::unauthorized("Invalid authorization format"))?;

    let identity = server.api_keys.resolve(presented.trim()).ok_or_else(|| {
        warn!(
            key = %server.redactor.fingerprint(presented),
            "Rejected request with unknown API key"
        );
        ApiError::unauthorized("Invalid API key")
    })?;

    request.extensions_mut().insert(identity.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(identity);
    Ok(response)
}

/// Request timing middleware
pub async fn request_timing_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %path,
        duration_ms = start.elapsed().as_millis(),
        status = response.status().as_u16(),
        "Request processed"
    );

    response
}

/// Audit logging middleware; logs who did what, never the credential
pub async fn audit_logging_middleware(
    State(server): State<ConfmanServer>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = server.redactor.redact(&request.uri().to_string());

    let response = next.run(request).await;

    let client_id = response
        .extensions()
        .get::<ClientIdentity>()
        .map_or("anonymous", |identity| identity.client_id.as_str());

    tracing::info!(
        method = %method,
        uri = %uri,
        client_id = client_id,
        status = response.status().as_u16(),
        timestamp = %chrono::Utc::now().to_rfc3339(),
        "Audit log: Request completed"
    );

    response
}

/// CORS layer for the configured origins
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(86_400))
}
