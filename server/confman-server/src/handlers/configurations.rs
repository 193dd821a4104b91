use crate::dto::{
    ApiJson, ConfigurationResponse, CreateConfigurationRequest, RollbackRequest,
    UpdateConfigurationRequest, VersionListResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::server::ConfmanServer;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

/// Create a configuration at version 1
pub async fn create_configuration(
    State(server): State<ConfmanServer>,
    ApiJson(request): ApiJson<CreateConfigurationRequest>,
) -> ApiResult<(StatusCode, Json<ConfigurationResponse>)> {
    let config = server.engine.create(&request.name, request.data).await?;
    Ok((StatusCode::CREATED, Json(config.into())))
}

pub async fn get_configuration(
    State(server): State<ConfmanServer>,
    Path(name): Path<String>,
) -> ApiResult<Json<ConfigurationResponse>> {
    let config = server.engine.get(&name).await?;
    Ok(Json(config.into()))
}

/// Replace the payload, producing the next version
pub async fn update_configuration(
    State(server): State<ConfmanServer>,
    Path(name): Path<String>,
    ApiJson(request): ApiJson<UpdateConfigurationRequest>,
) -> ApiResult<Json<ConfigurationResponse>> {
    let config = server.engine.update(&name, request.data).await?;
    Ok(Json(config.into()))
}

pub async fn list_versions(
    State(server): State<ConfmanServer>,
    Path(name): Path<String>,
) -> ApiResult<Json<VersionListResponse>> {
    let versions = server.engine.list_versions(&name).await?;
    Ok(Json(versions.into()))
}

pub async fn get_version(
    State(server): State<ConfmanServer>,
    Path((name, version)): Path<(String, String)>,
) -> ApiResult<Json<ConfigurationResponse>> {
    let version = parse_version(&version)?;
    let version = server.engine.resolve_version(&name, version).await?;
    let config = server.engine.get_version(&name, version).await?;
    Ok(Json(config.into()))
}

pub async fn rollback_configuration(
    State(server): State<ConfmanServer>,
    Path(name): Path<String>,
    ApiJson(request): ApiJson<RollbackRequest>,
) -> ApiResult<Json<ConfigurationResponse>> {
    let target = server
        .engine
        .resolve_version(&name, request.target_version)
        .await?;
    let config = server.engine.rollback(&name, target).await?;
    Ok(Json(config.into()))
}

fn parse_version(raw: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .map_err(|e| ApiError::bad_request("Invalid version number", e.to_string()))
}
