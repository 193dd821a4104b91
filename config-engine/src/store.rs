//! Storage abstraction for configurations, their history and schemas
//!
//! Backends persist three things per configuration: the head row, one
//! immutable record per version and, optionally, a JSON Schema. Every write
//! must be atomic: either the head and the new version record both land or
//! neither does.

use crate::model::{Configuration, Version, VersionInfo, VersionRecord};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    AlreadyExists,

    /// The head moved between read and write, or the version slot was taken
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Insert a brand new configuration together with its first version
    ///
    /// Fails with `AlreadyExists` when the name is taken.
    async fn insert_configuration(&self, config: &Configuration) -> StoreResult<()>;

    /// Write `config` as the new head, provided the current head is still
    /// `expected_head`
    ///
    /// Fails with `NotFound` when the configuration is absent and with
    /// `Conflict` when the head moved or `config.version` is already taken.
    async fn append_version(&self, expected_head: Version, config: &Configuration)
        -> StoreResult<()>;

    /// Current head, payload included
    async fn get_configuration(&self, name: &str) -> StoreResult<Configuration>;

    async fn get_version(&self, name: &str, version: Version) -> StoreResult<VersionRecord>;

    /// History metadata ascending by version; empty when the name is unknown
    async fn list_versions(&self, name: &str) -> StoreResult<Vec<VersionInfo>>;

    /// Insert or replace the schema registered under `name`
    async fn put_schema(&self, name: &str, schema: &Value) -> StoreResult<()>;

    async fn get_schema(&self, name: &str) -> StoreResult<Value>;

    async fn health_check(&self) -> StoreResult<()>;

    /// Short backend label for health reports and logs
    fn backend_name(&self) -> &'static str;
}
