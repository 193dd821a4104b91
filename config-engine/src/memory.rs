//! In-memory [`ConfigStore`] for tests and ephemeral deployments

use crate::model::{Configuration, Provenance, Version, VersionInfo, VersionRecord};
use crate::store::{ConfigStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
struct HeadRow {
    version: Version,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    provenance: Provenance,
}

#[derive(Debug, Default)]
struct MemoryState {
    heads: HashMap<String, HeadRow>,
    versions: BTreeMap<(String, Version), VersionRecord>,
    schemas: HashMap<String, Value>,
}

impl MemoryState {
    fn head_configuration(&self, name: &str) -> StoreResult<Configuration> {
        let head = self.heads.get(name).ok_or(StoreError::NotFound)?;
        let record = self
            .versions
            .get(&(name.to_string(), head.version))
            .ok_or_else(|| {
                StoreError::Backend(format!(
                    "payload missing for head version {} of '{name}'",
                    head.version
                ))
            })?;

        Ok(Configuration {
            name: name.to_string(),
            version: head.version,
            data: record.data.clone(),
            created_at: head.created_at,
            updated_at: head.updated_at,
            provenance: head.provenance,
        })
    }
}

/// Process-local store guarded by a single lock, so every write is atomic
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn insert_configuration(&self, config: &Configuration) -> StoreResult<()> {
        let mut state = self.state.write();
        if state.heads.contains_key(&config.name) {
            return Err(StoreError::AlreadyExists);
        }

        state.versions.insert(
            (config.name.clone(), config.version),
            config.to_version_record(),
        );
        state.heads.insert(
            config.name.clone(),
            HeadRow {
                version: config.version,
                created_at: config.created_at,
                updated_at: config.updated_at,
                provenance: config.provenance,
            },
        );
        Ok(())
    }

    async fn append_version(
        &self,
        expected_head: Version,
        config: &Configuration,
    ) -> StoreResult<()> {
        let mut state = self.state.write();
        let current = state
            .heads
            .get(&config.name)
            .map(|head| head.version)
            .ok_or(StoreError::NotFound)?;

        if current != expected_head {
            return Err(StoreError::Conflict(format!(
                "head of '{}' moved from {expected_head} to {current}",
                config.name
            )));
        }
        let key = (config.name.clone(), config.version);
        if state.versions.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "version {} of '{}' already exists",
                config.version, config.name
            )));
        }

        state.versions.insert(key, config.to_version_record());
        if let Some(head) = state.heads.get_mut(&config.name) {
            head.version = config.version;
            head.updated_at = config.updated_at;
            head.provenance = config.provenance;
        }
        Ok(())
    }

    async fn get_configuration(&self, name: &str) -> StoreResult<Configuration> {
        self.state.read().head_configuration(name)
    }

    async fn get_version(&self, name: &str, version: Version) -> StoreResult<VersionRecord> {
        self.state
            .read()
            .versions
            .get(&(name.to_string(), version))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_versions(&self, name: &str) -> StoreResult<Vec<VersionInfo>> {
        let state = self.state.read();
        let range = (name.to_string(), Version::MIN)..=(name.to_string(), Version::MAX);
        Ok(state
            .versions
            .range(range)
            .map(|(_, record)| VersionInfo::from(record))
            .collect())
    }

    async fn put_schema(&self, name: &str, schema: &Value) -> StoreResult<()> {
        self.state
            .write()
            .schemas
            .insert(name.to_string(), schema.clone());
        Ok(())
    }

    async fn get_schema(&self, name: &str) -> StoreResult<Value> {
        self.state
            .read()
            .schemas
            .get(name)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
