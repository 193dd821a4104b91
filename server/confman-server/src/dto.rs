// Request and response bodies of the HTTP API
use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use chrono::{DateTime, Utc};
use config_engine::{Configuration, Version, VersionInfo, VersionList};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON body extractor whose rejections use the API error body
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::bad_request(
                "Invalid request body",
                rejection.body_text(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateConfigurationRequest {
    pub name: String,
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConfigurationRequest {
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct RollbackRequest {
    /// Signed so that impossible versions surface as not found
    pub target_version: i64,
}

/// Wire form of a configuration; rollback fields appear only on rollback heads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationResponse {
    pub name: String,
    pub version: Version,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_from: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_to: Option<Version>,
}

impl From<Configuration> for ConfigurationResponse {
    fn from(config: Configuration) -> Self {
        Self {
            rollback_from: config.provenance.rollback_from(),
            rollback_to: config.provenance.rollback_to(),
            name: config.name,
            version: config.version,
            data: config.data,
            created_at: config.created_at,
            updated_at: config.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: Version,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_rollback: bool,
}

impl From<VersionInfo> for VersionEntry {
    fn from(info: VersionInfo) -> Self {
        Self {
            version: info.version,
            created_at: info.created_at,
            is_rollback: info.is_rollback,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionListResponse {
    pub name: String,
    pub versions: Vec<VersionEntry>,
}

impl From<VersionList> for VersionListResponse {
    fn from(list: VersionList) -> Self {
        Self {
            name: list.name,
            versions: list.versions.into_iter().map(VersionEntry::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRegisteredResponse {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub name: String,
    pub valid: bool,
}
