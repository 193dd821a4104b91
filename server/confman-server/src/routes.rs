use crate::{
    handlers::{configurations, health, schemas},
    middleware::api_key_auth_middleware,
    server::ConfmanServer,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

/// Create health check routes
pub fn health_routes() -> Router<ConfmanServer> {
    Router::new().route("/health", get(health::health_check))
}

/// Create configuration routes
pub fn configuration_routes() -> Router<ConfmanServer> {
    Router::new()
        .route("/configurations", post(configurations::create_configuration))
        .route(
            "/configurations/:name",
            get(configurations::get_configuration).put(configurations::update_configuration),
        )
        .route("/configurations/:name/versions", get(configurations::list_versions))
        .route(
            "/configurations/:name/versions/:version",
            get(configurations::get_version),
        )
        .route(
            "/configurations/:name/rollback",
            post(configurations::rollback_configuration),
        )
}

/// Create schema routes
pub fn schema_routes() -> Router<ConfmanServer> {
    Router::new()
        .route("/schemas/:name", post(schemas::register_schema).get(schemas::get_schema))
        .route("/schemas/:name/validate", post(schemas::validate_data))
}

/// Versioned API, every route behind API-key authentication
pub fn api_v1_routes(server: ConfmanServer) -> Router<ConfmanServer> {
    Router::new()
        .merge(configuration_routes())
        .merge(schema_routes())
        .route_layer(from_fn_with_state(server, api_key_auth_middleware))
}
