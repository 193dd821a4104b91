// SQLite implementation of the configuration store
use crate::connection::{DatabaseConfig, DatabasePool};
use crate::error::{DatabaseError, DatabaseResult};
use crate::migration::initialize_schema;
use crate::transaction::TransactionManager;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use config_engine::{
    ConfigStore, Configuration, Provenance, StoreError, StoreResult, Version, VersionInfo,
    VersionRecord,
};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, warn};

/// [`ConfigStore`] persisted in four SQLite tables
#[derive(Clone, Debug)]
pub struct SqliteConfigStore {
    pool: DatabasePool,
    transactions: TransactionManager,
}

impl SqliteConfigStore {
    /// Open the database at `config.path` and make sure its tables exist
    pub async fn connect(config: &DatabaseConfig) -> DatabaseResult<Self> {
        let pool = DatabasePool::new(config).await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: DatabasePool) -> DatabaseResult<Self> {
        initialize_schema(pool.pool()).await?;
        Ok(Self {
            transactions: TransactionManager::new(pool.clone()),
            pool,
        })
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    async fn insert_version_rows(
        tx: &mut Transaction<'static, Sqlite>,
        config: &Configuration,
    ) -> DatabaseResult<()> {
        let record = config.to_version_record();
        sqlx::query(
            r#"
            INSERT INTO versions (name, version, created_at, is_rollback)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&record.name)
        .bind(i64::from(record.version))
        .bind(encode_timestamp(record.created_at))
        .bind(record.is_rollback)
        .execute(&mut **tx)
        .await?;

        sqlx::query("INSERT INTO version_data (name, version, data) VALUES (?, ?, ?)")
            .bind(&record.name)
            .bind(i64::from(record.version))
            .bind(encode_json(&record.data)?)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn insert_configuration(&self, config: &Configuration) -> StoreResult<()> {
        let mut tx = self.transactions.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO configurations (name, version, created_at, updated_at, rollback_from, rollback_to)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&config.name)
        .bind(i64::from(config.version))
        .bind(encode_timestamp(config.created_at))
        .bind(encode_timestamp(config.updated_at))
        .bind(config.provenance.rollback_from().map(i64::from))
        .bind(config.provenance.rollback_to().map(i64::from))
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from);

        if let Err(err) = inserted {
            return Err(if err.is_unique_violation() {
                StoreError::AlreadyExists
            } else {
                err.into()
            });
        }

        Self::insert_version_rows(&mut tx, config).await?;
        self.transactions.commit(tx).await?;

        debug!(name = %config.name, "Inserted configuration with first version");
        Ok(())
    }

    async fn append_version(
        &self,
        expected_head: Version,
        config: &Configuration,
    ) -> StoreResult<()> {
        let mut tx = self.transactions.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE configurations
            SET version = ?, updated_at = ?, rollback_from = ?, rollback_to = ?
            WHERE name = ? AND version = ?
            "#,
        )
        .bind(i64::from(config.version))
        .bind(encode_timestamp(config.updated_at))
        .bind(config.provenance.rollback_from().map(i64::from))
        .bind(config.provenance.rollback_to().map(i64::from))
        .bind(&config.name)
        .bind(i64::from(expected_head))
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from)?;

        if updated.rows_affected() == 0 {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT version FROM configurations WHERE name = ?")
                    .bind(&config.name)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(DatabaseError::from)?;

            return Err(match current {
                None => StoreError::NotFound,
                Some(current) => {
                    warn!(name = %config.name, expected_head, current, "Head moved during write");
                    StoreError::Conflict(format!(
                        "head of '{}' moved from {expected_head} to {current}",
                        config.name
                    ))
                }
            });
        }

        if let Err(err) = Self::insert_version_rows(&mut tx, config).await {
            return Err(if err.is_unique_violation() {
                StoreError::Conflict(format!(
                    "version {} of '{}' already exists",
                    config.version, config.name
                ))
            } else {
                err.into()
            });
        }

        self.transactions.commit(tx).await?;
        debug!(name = %config.name, version = config.version, "Appended version");
        Ok(())
    }

    async fn get_configuration(&self, name: &str) -> StoreResult<Configuration> {
        let row = sqlx::query(
            r#"
            SELECT c.name, c.version, c.created_at, c.updated_at,
                   c.rollback_from, c.rollback_to, d.data
            FROM configurations c
            JOIN version_data d ON d.name = c.name AND d.version = c.version
            WHERE c.name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(DatabaseError::from)?
        .ok_or(StoreError::NotFound)?;

        Ok(configuration_from_row(&row)?)
    }

    async fn get_version(&self, name: &str, version: Version) -> StoreResult<VersionRecord> {
        let row = sqlx::query(
            r#"
            SELECT v.name, v.version, v.created_at, v.is_rollback, d.data
            FROM versions v
            JOIN version_data d ON d.name = v.name AND d.version = v.version
            WHERE v.name = ? AND v.version = ?
            "#,
        )
        .bind(name)
        .bind(i64::from(version))
        .fetch_optional(self.pool.pool())
        .await
        .map_err(DatabaseError::from)?
        .ok_or(StoreError::NotFound)?;

        Ok(version_record_from_row(&row)?)
    }

    async fn list_versions(&self, name: &str) -> StoreResult<Vec<VersionInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT version, created_at, is_rollback
            FROM versions
            WHERE name = ?
            ORDER BY version ASC
            "#,
        )
        .bind(name)
        .fetch_all(self.pool.pool())
        .await
        .map_err(DatabaseError::from)?;

        let mut versions = Vec::with_capacity(rows.len());
        for row in &rows {
            versions.push(VersionInfo {
                version: decode_version(row, "version")?,
                created_at: decode_timestamp(row, "created_at")?,
                is_rollback: row.try_get("is_rollback").map_err(DatabaseError::from)?,
            });
        }
        Ok(versions)
    }

    async fn put_schema(&self, name: &str, schema: &Value) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO schemas (name, schema, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET schema = excluded.schema, updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(encode_json(schema)?)
        .bind(encode_timestamp(Utc::now()))
        .execute(self.pool.pool())
        .await
        .map_err(DatabaseError::from)?;

        Ok(())
    }

    async fn get_schema(&self, name: &str) -> StoreResult<Value> {
        let raw: String = sqlx::query_scalar("SELECT schema FROM schemas WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(DatabaseError::from)?
            .ok_or(StoreError::NotFound)?;

        Ok(decode_json(&raw)?)
    }

    async fn health_check(&self) -> StoreResult<()> {
        if self.pool.is_healthy().await {
            Ok(())
        } else {
            Err(StoreError::Backend("database is not reachable".to_string()))
        }
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(row: &SqliteRow, column: &str) -> DatabaseResult<DateTime<Utc>> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow(format!("{column} '{raw}': {e}")))
}

fn decode_version(row: &SqliteRow, column: &str) -> DatabaseResult<Version> {
    let raw: i64 = row.try_get(column)?;
    Version::try_from(raw).map_err(|_| DatabaseError::CorruptRow(format!("{column} out of range: {raw}")))
}

fn decode_optional_version(row: &SqliteRow, column: &str) -> DatabaseResult<Option<Version>> {
    let raw: Option<i64> = row.try_get(column)?;
    raw.map(|value| {
        Version::try_from(value)
            .map_err(|_| DatabaseError::CorruptRow(format!("{column} out of range: {value}")))
    })
    .transpose()
}

fn encode_json(value: &Value) -> DatabaseResult<String> {
    serde_json::to_string(value).map_err(|e| DatabaseError::QueryFailed(e.to_string()))
}

fn decode_json(raw: &str) -> DatabaseResult<Value> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::CorruptRow(format!("payload: {e}")))
}

fn configuration_from_row(row: &SqliteRow) -> DatabaseResult<Configuration> {
    let data: String = row.try_get("data")?;
    Ok(Configuration {
        name: row.try_get("name")?,
        version: decode_version(row, "version")?,
        data: decode_json(&data)?,
        created_at: decode_timestamp(row, "created_at")?,
        updated_at: decode_timestamp(row, "updated_at")?,
        provenance: Provenance::from_columns(
            decode_optional_version(row, "rollback_from")?,
            decode_optional_version(row, "rollback_to")?,
        ),
    })
}

fn version_record_from_row(row: &SqliteRow) -> DatabaseResult<VersionRecord> {
    let data: String = row.try_get("data")?;
    Ok(VersionRecord {
        name: row.try_get("name")?,
        version: decode_version(row, "version")?,
        created_at: decode_timestamp(row, "created_at")?,
        is_rollback: row.try_get("is_rollback")?,
        data: decode_json(&data)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_engine::{ConfigEngine, ConfigError};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn create_test_store() -> (SqliteConfigStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig::new(dir.path().join("config.db"));
        let store = SqliteConfigStore::connect(&config).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_insert_and_read_back_exactly() {
        let (store, _dir) = create_test_store().await;
        let config = Configuration::new("app", json!({"nested": {"list": [1, 2, 3]}}), Utc::now());

        store.insert_configuration(&config).await.unwrap();
        assert_eq!(store.get_configuration("app").await.unwrap(), config);

        let record = store.get_version("app", 1).await.unwrap();
        assert_eq!(record, config.to_version_record());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_already_exists() {
        let (store, _dir) = create_test_store().await;
        let config = Configuration::new("app", json!({}), Utc::now());
        store.insert_configuration(&config).await.unwrap();

        assert_eq!(
            store.insert_configuration(&config).await,
            Err(StoreError::AlreadyExists)
        );
    }

    #[tokio::test]
    async fn test_append_checks_expected_head() {
        let (store, _dir) = create_test_store().await;
        let v1 = Configuration::new("app", json!(1), Utc::now());
        store.insert_configuration(&v1).await.unwrap();

        let v2 = v1.next_version(json!(2), Utc::now()).unwrap();
        store.append_version(1, &v2).await.unwrap();

        let stale = v1.next_version(json!("stale"), Utc::now()).unwrap();
        assert!(matches!(
            store.append_version(1, &stale).await,
            Err(StoreError::Conflict(_))
        ));

        let head = store.get_configuration("app").await.unwrap();
        assert_eq!(head.version, 2);
        assert_eq!(head.data, json!(2));
        assert_eq!(store.list_versions("app").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_append_to_missing_configuration() {
        let (store, _dir) = create_test_store().await;
        let orphan = Configuration::new("ghost", json!({}), Utc::now());
        assert_eq!(
            store.append_version(1, &orphan).await,
            Err(StoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_rollback_provenance_persists() {
        let (store, _dir) = create_test_store().await;
        let now = Utc::now();
        let v1 = Configuration::new("app", json!({"a": 1}), now);
        store.insert_configuration(&v1).await.unwrap();
        let v2 = v1.next_version(json!({"a": 2}), now).unwrap();
        store.append_version(1, &v2).await.unwrap();
        let v3 = v2.rolled_back(1, json!({"a": 1}), now).unwrap();
        store.append_version(2, &v3).await.unwrap();

        let head = store.get_configuration("app").await.unwrap();
        assert_eq!(head.provenance, Provenance::RollbackOf { from: 2, to: 1 });

        let versions = store.list_versions("app").await.unwrap();
        let flags: Vec<bool> = versions.iter().map(|v| v.is_rollback).collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[tokio::test]
    async fn test_missing_rows_are_not_found() {
        let (store, _dir) = create_test_store().await;
        assert_eq!(store.get_configuration("ghost").await, Err(StoreError::NotFound));
        assert_eq!(store.get_version("ghost", 1).await, Err(StoreError::NotFound));
        assert_eq!(store.get_schema("ghost").await, Err(StoreError::NotFound));
        assert!(store.list_versions("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_schema_upsert_replaces() {
        let (store, _dir) = create_test_store().await;
        store.put_schema("app", &json!({"type": "object"})).await.unwrap();
        store.put_schema("app", &json!({"type": "array"})).await.unwrap();
        assert_eq!(store.get_schema("app").await.unwrap(), json!({"type": "array"}));
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig::new(dir.path().join("config.db"));

        {
            let store = SqliteConfigStore::connect(&config).await.unwrap();
            let engine = ConfigEngine::new(Arc::new(store.clone()));
            engine.create("app", json!({"a": 1})).await.unwrap();
            engine.update("app", json!({"a": 2})).await.unwrap();
            store.pool().close().await;
        }

        let reopened = SqliteConfigStore::connect(&config).await.unwrap();
        let engine = ConfigEngine::new(Arc::new(reopened));
        assert_eq!(engine.get("app").await.unwrap().version, 2);
        assert_eq!(engine.get_version("app", 1).await.unwrap().data, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_engine_scenario_on_sqlite() {
        let (store, _dir) = create_test_store().await;
        let engine = ConfigEngine::new(Arc::new(store));

        engine
            .register_schema("payment-config", json!({"type": "object", "required": ["max_limit"]}))
            .await
            .unwrap();
        assert!(matches!(
            engine.create("payment-config", json!({})).await,
            Err(ConfigError::ValidationFailed { .. })
        ));

        engine
            .create("payment-config", json!({"max_limit": 1000, "enabled": true}))
            .await
            .unwrap();
        engine
            .update("payment-config", json!({"max_limit": 2000, "enabled": false}))
            .await
            .unwrap();
        let v3 = engine.rollback("payment-config", 1).await.unwrap();

        assert_eq!(v3.version, 3);
        assert_eq!(v3.data, json!({"max_limit": 1000, "enabled": true}));
        assert!(engine.rollback("payment-config", 7).await.unwrap_err().is_not_found());
        assert_eq!(engine.get("payment-config").await.unwrap().version, 3);
    }

    const RAW_PAYLOAD: &str =
        r#"{"zeta":1,"alpha":2,"big":123456789012345678901234567890,"nested":{"y":[3,1],"x":null}}"#;

    async fn fail_version_data_inserts(store: &SqliteConfigStore) {
        sqlx::query(
            "CREATE TRIGGER fail_version_data BEFORE INSERT ON version_data \
             BEGIN SELECT RAISE(ABORT, 'boom'); END",
        )
        .execute(store.pool().pool())
        .await
        .unwrap();
    }

    async fn count_rows(store: &SqliteConfigStore, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(store.pool().pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_payload_text_survives_storage() {
        let (store, _dir) = create_test_store().await;
        let data: Value = serde_json::from_str(RAW_PAYLOAD).unwrap();
        store
            .insert_configuration(&Configuration::new("app", data, Utc::now()))
            .await
            .unwrap();

        let head = store.get_configuration("app").await.unwrap();
        assert_eq!(serde_json::to_string(&head.data).unwrap(), RAW_PAYLOAD);
        let record = store.get_version("app", 1).await.unwrap();
        assert_eq!(serde_json::to_string(&record.data).unwrap(), RAW_PAYLOAD);
    }

    #[tokio::test]
    async fn test_schema_key_order_survives_storage() {
        let (store, _dir) = create_test_store().await;
        let raw = r#"{"type":"object","required":["b"],"properties":{"b":{"type":"string"},"a":{"type":"integer"}}}"#;
        let schema: Value = serde_json::from_str(raw).unwrap();

        store.put_schema("app", &schema).await.unwrap();
        let stored = store.get_schema("app").await.unwrap();
        assert_eq!(serde_json::to_string(&stored).unwrap(), raw);
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_nothing_behind() {
        let (store, _dir) = create_test_store().await;
        fail_version_data_inserts(&store).await;

        let config = Configuration::new("app", json!({"a": 1}), Utc::now());
        let err = store.insert_configuration(&config).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)), "{err:?}");

        assert_eq!(store.get_configuration("app").await, Err(StoreError::NotFound));
        assert!(store.list_versions("app").await.unwrap().is_empty());
        assert_eq!(count_rows(&store, "configurations").await, 0);
        assert_eq!(count_rows(&store, "versions").await, 0);
    }

    #[tokio::test]
    async fn test_failed_append_keeps_previous_head() {
        let (store, _dir) = create_test_store().await;
        let v1 = Configuration::new("app", json!({"a": 1}), Utc::now());
        store.insert_configuration(&v1).await.unwrap();
        fail_version_data_inserts(&store).await;

        let v2 = v1.next_version(json!({"a": 2}), Utc::now()).unwrap();
        let err = store.append_version(1, &v2).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)), "{err:?}");

        let head = store.get_configuration("app").await.unwrap();
        assert_eq!(head.version, 1);
        assert_eq!(head.data, json!({"a": 1}));
        assert_eq!(store.list_versions("app").await.unwrap().len(), 1);
        assert_eq!(store.get_version("app", 2).await, Err(StoreError::NotFound));
        assert_eq!(count_rows(&store, "versions").await, 1);
    }
}
