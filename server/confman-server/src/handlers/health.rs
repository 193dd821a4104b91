use crate::server::ConfmanServer;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize, Deserialize)]
pub struct StorageHealth {
    pub backend: String,
    pub status: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: StorageHealth,
}

/// Health check handler; unauthenticated
pub async fn health_check(State(server): State<ConfmanServer>) -> (StatusCode, Json<HealthResponse>) {
    let store = server.engine.store();
    let (status_code, status) = match store.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            warn!(error = %e, "Storage health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            storage: StorageHealth {
                backend: store.backend_name().to_string(),
                status: status.to_string(),
            },
        }),
    )
}
