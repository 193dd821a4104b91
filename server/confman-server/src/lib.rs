//! Confman HTTP server
//!
//! Exposes the configuration engine over a JSON API under `/api/v1`, guarded
//! by bearer API keys, plus an unauthenticated `/health` probe.

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod settings;

pub use auth::{ApiKeys, ClientIdentity};
pub use error::{ApiError, ApiResult};
pub use server::ConfmanServer;
pub use settings::ServerSettings;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the main application router with all routes and middleware
pub fn create_app(server: ConfmanServer) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .nest("/api/v1", routes::api_v1_routes(server.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::create_cors_layer(&server.cors_origins))
                .layer(from_fn(middleware::request_timing_middleware))
                .layer(from_fn_with_state(
                    server.clone(),
                    middleware::audit_logging_middleware,
                )),
        )
        .with_state(server)
}
