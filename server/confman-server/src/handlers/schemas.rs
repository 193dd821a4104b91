use crate::dto::{SchemaRegisteredResponse, ValidationResponse};
use crate::error::{ApiError, ApiResult};
use crate::server::ConfmanServer;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use config_engine::parse_schema_definition;
use serde_json::Value;

/// Register or replace the JSON Schema for a configuration name
///
/// The body is the schema document itself.
pub async fn register_schema(
    State(server): State<ConfmanServer>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<SchemaRegisteredResponse>)> {
    let schema = parse_schema_definition(&body)?;
    server.engine.register_schema(&name, schema).await?;

    Ok((
        StatusCode::CREATED,
        Json(SchemaRegisteredResponse {
            name,
            status: "schema registered successfully".to_string(),
        }),
    ))
}

pub async fn get_schema(
    State(server): State<ConfmanServer>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    let schema = server.engine.get_schema(&name).await?;
    Ok(Json(schema))
}

/// Dry-run validation of a document against the registered schema
pub async fn validate_data(
    State(server): State<ConfmanServer>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<Json<ValidationResponse>> {
    let data: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request("Invalid JSON data", e.to_string()))?;
    server.engine.validate_data(&name, &data).await?;

    Ok(Json(ValidationResponse { name, valid: true }))
}
