// Versioning engine: every write validates, then appends one version
use crate::error::{ConfigError, ConfigResult, CONFIGURATION, CONFIGURATION_VERSION, SCHEMA};
use crate::model::{Configuration, Version, VersionList};
use crate::store::{ConfigStore, StoreError};
use crate::validation::{ConfigValidator, JsonSchemaValidator};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Creates, updates and rolls back configurations on top of a [`ConfigStore`]
#[derive(Clone)]
pub struct ConfigEngine {
    store: Arc<dyn ConfigStore>,
    validator: Arc<dyn ConfigValidator>,
}

impl std::fmt::Debug for ConfigEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigEngine")
            .field("store", &self.store.backend_name())
            .finish_non_exhaustive()
    }
}

impl ConfigEngine {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            validator: Arc::new(JsonSchemaValidator::new()),
        }
    }

    /// Replace the schema validator
    pub fn with_validator(mut self, validator: Arc<dyn ConfigValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    /// Create `name` at version 1
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for an empty name, `AlreadyExists` when the name is
    /// taken, `ValidationFailed` when a registered schema rejects `data`.
    pub async fn create(&self, name: &str, data: Value) -> ConfigResult<Configuration> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidRequest(
                "configuration name must not be empty".to_string(),
            ));
        }

        match self.store.get_configuration(name).await {
            Ok(_) => return Err(ConfigError::already_exists(CONFIGURATION, name)),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(ConfigError::from_store(e, CONFIGURATION, name)),
        }

        self.check_against_schema(name, &data).await?;

        let config = Configuration::new(name, data, Utc::now());
        self.store
            .insert_configuration(&config)
            .await
            .map_err(|e| ConfigError::from_store(e, CONFIGURATION, name))?;

        info!(name = %config.name, version = config.version, "Configuration created");
        Ok(config)
    }

    /// Replace the payload of `name`, producing version head+1
    ///
    /// # Errors
    ///
    /// `NotFound` when `name` does not exist, `ValidationFailed` when a
    /// registered schema rejects `data`, `Conflict` when another writer
    /// advanced the head first.
    pub async fn update(&self, name: &str, data: Value) -> ConfigResult<Configuration> {
        let current = self.head(name).await?;
        self.check_against_schema(name, &data).await?;

        let next = current.next_version(data, Utc::now())?;
        self.store
            .append_version(current.version, &next)
            .await
            .map_err(|e| ConfigError::from_store(e, CONFIGURATION, name))?;

        info!(name = %next.name, version = next.version, "Configuration updated");
        Ok(next)
    }

    /// Copy the payload of `target` forward as a new head
    ///
    /// Historical payloads are not re-validated against the current schema.
    ///
    /// # Errors
    ///
    /// `NotFound` when `name` or `target` does not exist, `Conflict` when
    /// another writer advanced the head first.
    pub async fn rollback(&self, name: &str, target: Version) -> ConfigResult<Configuration> {
        let current = self.head(name).await?;
        let record = self
            .store
            .get_version(name, target)
            .await
            .map_err(|e| ConfigError::from_store(e, CONFIGURATION_VERSION, version_id(name, target)))?;

        let next = current.rolled_back(target, record.data, Utc::now())?;
        self.store
            .append_version(current.version, &next)
            .await
            .map_err(|e| ConfigError::from_store(e, CONFIGURATION, name))?;

        info!(
            name = %next.name,
            version = next.version,
            rollback_from = current.version,
            rollback_to = target,
            "Configuration rolled back"
        );
        Ok(next)
    }

    /// Map a client-supplied version number onto [`Version`]
    ///
    /// Numbers outside the version space (zero, negative, too large) can
    /// never name a stored version and are reported as `NotFound`, after the
    /// configuration itself has been looked up.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown configuration or an impossible version.
    pub async fn resolve_version(&self, name: &str, requested: i64) -> ConfigResult<Version> {
        match Version::try_from(requested) {
            Ok(version) => Ok(version),
            Err(_) => {
                self.head(name).await?;
                Err(ConfigError::not_found(
                    CONFIGURATION_VERSION,
                    format!("{name}:{requested}"),
                ))
            }
        }
    }

    /// Current head of `name`
    pub async fn get(&self, name: &str) -> ConfigResult<Configuration> {
        self.head(name).await
    }

    /// `name` as it was at `version`
    ///
    /// The result keeps the configuration's creation time and reports the
    /// version's own creation time as `updated_at`.
    pub async fn get_version(&self, name: &str, version: Version) -> ConfigResult<Configuration> {
        let head = self.head(name).await?;
        let record = self
            .store
            .get_version(name, version)
            .await
            .map_err(|e| ConfigError::from_store(e, CONFIGURATION_VERSION, version_id(name, version)))?;

        debug!(name, version, "Historical version loaded");
        Ok(Configuration::from_history(record, head.created_at))
    }

    pub async fn list_versions(&self, name: &str) -> ConfigResult<VersionList> {
        let versions = self
            .store
            .list_versions(name)
            .await
            .map_err(|e| ConfigError::from_store(e, CONFIGURATION, name))?;

        if versions.is_empty() {
            return Err(ConfigError::not_found(CONFIGURATION, name));
        }

        Ok(VersionList {
            name: name.to_string(),
            versions,
        })
    }

    /// Register or replace the schema for `name`
    ///
    /// # Errors
    ///
    /// `InvalidSchema` when `schema` does not compile.
    pub async fn register_schema(&self, name: &str, schema: Value) -> ConfigResult<()> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidRequest(
                "schema name must not be empty".to_string(),
            ));
        }

        self.validator.validate_schema_definition(&schema)?;
        self.store
            .put_schema(name, &schema)
            .await
            .map_err(|e| ConfigError::from_store(e, SCHEMA, name))?;

        info!(name, "Schema registered");
        Ok(())
    }

    pub async fn get_schema(&self, name: &str) -> ConfigResult<Value> {
        self.store
            .get_schema(name)
            .await
            .map_err(|e| ConfigError::from_store(e, SCHEMA, name))
    }

    /// Validate `data` against the schema registered for `name` without
    /// persisting anything
    ///
    /// # Errors
    ///
    /// `NotFound` when no schema is registered, `ValidationFailed` with one
    /// violation per failed rule otherwise.
    pub async fn validate_data(&self, name: &str, data: &Value) -> ConfigResult<()> {
        let schema = self.get_schema(name).await?;
        self.validator.validate_json(&schema, data)
    }

    async fn head(&self, name: &str) -> ConfigResult<Configuration> {
        self.store
            .get_configuration(name)
            .await
            .map_err(|e| ConfigError::from_store(e, CONFIGURATION, name))
    }

    async fn check_against_schema(&self, name: &str, data: &Value) -> ConfigResult<()> {
        let schema = match self.store.get_schema(name).await {
            Ok(schema) => schema,
            Err(StoreError::NotFound) => return Ok(()),
            Err(e) => return Err(ConfigError::from_store(e, SCHEMA, name)),
        };

        self.validator.validate_json(&schema, data).map_err(|e| {
            warn!(name, violations = e.violations().len(), "Configuration rejected by schema");
            e
        })
    }
}

fn version_id(name: &str, version: Version) -> String {
    format!("{name}:{version}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::model::Provenance;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine() -> ConfigEngine {
        ConfigEngine::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_starts_at_version_one() {
        let engine = engine();
        let data = json!({"max_limit": 1000, "enabled": true});
        let config = engine.create("payment-config", data.clone()).await.unwrap();

        assert_eq!(config.version, 1);
        assert_eq!(config.created_at, config.updated_at);
        assert_eq!(engine.get_version("payment-config", 1).await.unwrap().data, data);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_name() {
        let err = engine().create("  ", json!({})).await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_duplicate_create_leaves_existing_untouched() {
        let engine = engine();
        engine.create("app", json!({"a": 1})).await.unwrap();

        let err = engine.create("app", json!({"a": 2})).await.unwrap_err();
        assert_eq!(err, ConfigError::already_exists(CONFIGURATION, "app"));

        let head = engine.get("app").await.unwrap();
        assert_eq!(head.version, 1);
        assert_eq!(head.data, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_update_appends_and_keeps_history() {
        let engine = engine();
        let v1 = engine.create("app", json!({"a": 1})).await.unwrap();
        let v2 = engine.update("app", json!({"a": 2})).await.unwrap();

        assert_eq!(v2.version, 2);
        assert_eq!(v2.created_at, v1.created_at);
        assert_eq!(v2.provenance, Provenance::Plain);
        assert_eq!(engine.list_versions("app").await.unwrap().versions.len(), 2);
        assert_eq!(engine.get_version("app", 1).await.unwrap().data, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_update_missing_configuration() {
        let err = engine().update("ghost", json!({})).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_payment_config_scenario() {
        let engine = engine();
        let original = json!({"max_limit": 1000, "enabled": true});

        let v1 = engine.create("payment-config", original.clone()).await.unwrap();
        assert_eq!(v1.version, 1);

        let v2 = engine
            .update("payment-config", json!({"max_limit": 2000, "enabled": false}))
            .await
            .unwrap();
        assert_eq!(v2.version, 2);
        assert_eq!(v2.data, json!({"max_limit": 2000, "enabled": false}));
        assert_eq!(v2.created_at, v1.created_at);

        let v3 = engine.rollback("payment-config", 1).await.unwrap();
        assert_eq!(v3.version, 3);
        assert_eq!(v3.data, original);
        assert_eq!(v3.provenance, Provenance::RollbackOf { from: 2, to: 1 });

        let list = engine.list_versions("payment-config").await.unwrap();
        assert_eq!(list.name, "payment-config");
        let numbers: Vec<Version> = list.versions.iter().map(|v| v.version).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(list.versions[2].is_rollback);
        assert!(!list.versions[1].is_rollback);
    }

    #[tokio::test]
    async fn test_rollback_to_current_head_still_bumps_version() {
        let engine = engine();
        engine.create("app", json!({"a": 1})).await.unwrap();
        engine.update("app", json!({"a": 2})).await.unwrap();

        let v3 = engine.rollback("app", 2).await.unwrap();
        assert_eq!(v3.version, 3);
        assert_eq!(v3.data, json!({"a": 2}));
        assert_eq!(v3.provenance, Provenance::RollbackOf { from: 2, to: 2 });
    }

    #[tokio::test]
    async fn test_rollback_to_missing_version_changes_nothing() {
        let engine = engine();
        engine.create("app", json!({"a": 1})).await.unwrap();

        for target in [0, 2, 99] {
            let err = engine.rollback("app", target).await.unwrap_err();
            assert_eq!(
                err,
                ConfigError::not_found(CONFIGURATION_VERSION, format!("app:{target}"))
            );
        }

        let head = engine.get("app").await.unwrap();
        assert_eq!(head.version, 1);
        assert_eq!(engine.list_versions("app").await.unwrap().versions.len(), 1);
    }

    #[tokio::test]
    async fn test_impossible_versions_resolve_to_not_found() {
        let engine = engine();
        engine.create("app", json!({"a": 1})).await.unwrap();

        assert_eq!(engine.resolve_version("app", 1).await.unwrap(), 1);
        for requested in [-1_i64, i64::from(Version::MAX) + 1] {
            let err = engine.resolve_version("app", requested).await.unwrap_err();
            assert_eq!(
                err,
                ConfigError::not_found(CONFIGURATION_VERSION, format!("app:{requested}"))
            );
        }

        let err = engine.resolve_version("ghost", -3).await.unwrap_err();
        assert_eq!(err, ConfigError::not_found(CONFIGURATION, "ghost"));
    }

    #[tokio::test]
    async fn test_rollback_missing_configuration() {
        let err = engine().rollback("ghost", 1).await.unwrap_err();
        assert_eq!(err, ConfigError::not_found(CONFIGURATION, "ghost"));
    }

    #[tokio::test]
    async fn test_get_version_reports_original_creation_time() {
        let engine = engine();
        let v1 = engine.create("app", json!(1)).await.unwrap();
        let v2 = engine.update("app", json!(2)).await.unwrap();

        let historical = engine.get_version("app", 2).await.unwrap();
        assert_eq!(historical.created_at, v1.created_at);
        assert_eq!(historical.updated_at, v2.updated_at);
        assert!(engine.get_version("app", 3).await.unwrap_err().is_not_found());
        assert!(engine.get_version("ghost", 1).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_versions_missing_configuration() {
        assert!(engine().list_versions("ghost").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_schema_gates_create_and_update() {
        let engine = engine();
        engine
            .register_schema("x", json!({"type": "object", "required": ["k"]}))
            .await
            .unwrap();

        let err = engine.create("x", json!({})).await.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed { .. }));
        assert!(engine.get("x").await.unwrap_err().is_not_found());

        engine.create("x", json!({"k": 1})).await.unwrap();
        assert!(matches!(
            engine.update("x", json!({"other": true})).await,
            Err(ConfigError::ValidationFailed { .. })
        ));
        assert_eq!(engine.get("x").await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_rollback_skips_schema_validation() {
        let engine = engine();
        engine.create("app", json!({"legacy": true})).await.unwrap();
        engine.update("app", json!({"k": 1, "legacy": false})).await.unwrap();
        engine
            .register_schema("app", json!({"type": "object", "required": ["k"]}))
            .await
            .unwrap();

        let v3 = engine.rollback("app", 1).await.unwrap();
        assert_eq!(v3.data, json!({"legacy": true}));
    }

    #[tokio::test]
    async fn test_schema_registration_and_lookup() {
        let engine = engine();
        assert!(engine.get_schema("app").await.unwrap_err().is_not_found());

        let err = engine
            .register_schema("app", json!({"type": 12}))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSchema(_)));

        engine
            .register_schema("app", json!({"type": "object"}))
            .await
            .unwrap();
        engine
            .register_schema("app", json!({"type": "array"}))
            .await
            .unwrap();
        assert_eq!(engine.get_schema("app").await.unwrap(), json!({"type": "array"}));
    }

    #[tokio::test]
    async fn test_validate_data() {
        let engine = engine();
        assert!(engine
            .validate_data("app", &json!({}))
            .await
            .unwrap_err()
            .is_not_found());

        engine
            .register_schema("app", json!({"type": "object", "required": ["k"]}))
            .await
            .unwrap();
        engine.validate_data("app", &json!({"k": "v"})).await.unwrap();

        let err = engine.validate_data("app", &json!({})).await.unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].field, "(root)");
    }

    struct CountingValidator {
        calls: AtomicUsize,
    }

    impl ConfigValidator for CountingValidator {
        fn validate_schema_definition(&self, _schema: &Value) -> ConfigResult<()> {
            Ok(())
        }

        fn validate_json(&self, _schema: &Value, _data: &Value) -> ConfigResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_custom_validator_is_consulted_only_with_a_schema() {
        let validator = Arc::new(CountingValidator {
            calls: AtomicUsize::new(0),
        });
        let engine = engine().with_validator(validator.clone());

        engine.create("plain", json!({})).await.unwrap();
        assert_eq!(validator.calls.load(Ordering::SeqCst), 0);

        engine.register_schema("gated", json!("anything")).await.unwrap();
        engine.create("gated", json!({})).await.unwrap();
        engine.update("gated", json!({})).await.unwrap();
        assert_eq!(validator.calls.load(Ordering::SeqCst), 2);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Update(i64),
        Rollback(Version),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<i64>().prop_map(Op::Update),
            (0u32..12).prop_map(Op::Rollback),
        ]
    }

    proptest! {
        #[test]
        fn prop_history_stays_contiguous(ops in prop::collection::vec(op_strategy(), 1..20)) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let engine = engine();
                engine.create("prop", json!(0)).await.unwrap();
                let mut payloads = vec![json!(0)];

                for op in ops {
                    let head = engine.get("prop").await.unwrap();
                    match op {
                        Op::Update(value) => {
                            let next = engine.update("prop", json!(value)).await.unwrap();
                            prop_assert_eq!(next.version, head.version + 1);
                            payloads.push(json!(value));
                        }
                        Op::Rollback(target) => {
                            let exists = target >= 1 && (target as usize) <= payloads.len();
                            match engine.rollback("prop", target).await {
                                Ok(next) => {
                                    prop_assert!(exists);
                                    prop_assert_eq!(next.version, head.version + 1);
                                    prop_assert_eq!(
                                        next.provenance,
                                        Provenance::RollbackOf { from: head.version, to: target }
                                    );
                                    let copied = payloads[(target - 1) as usize].clone();
                                    prop_assert_eq!(&next.data, &copied);
                                    payloads.push(copied);
                                }
                                Err(err) => {
                                    prop_assert!(!exists);
                                    prop_assert!(err.is_not_found());
                                }
                            }
                        }
                    }
                }

                let list = engine.list_versions("prop").await.unwrap();
                let head = engine.get("prop").await.unwrap();
                let numbers: Vec<Version> = list.versions.iter().map(|v| v.version).collect();
                let expected: Vec<Version> = (1..=head.version).collect();
                prop_assert_eq!(numbers, expected);
                prop_assert_eq!(head.version as usize, payloads.len());
                for (index, payload) in payloads.iter().enumerate() {
                    let version = Version::try_from(index + 1).unwrap();
                    prop_assert_eq!(&engine.get_version("prop", version).await.unwrap().data, payload);
                }
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
