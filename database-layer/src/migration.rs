// Schema bootstrap for the configuration store
use crate::error::{DatabaseError, DatabaseResult};
use sqlx::SqlitePool;
use tracing::info;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS configurations (
        name TEXT PRIMARY KEY,
        version INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        rollback_from INTEGER,
        rollback_to INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS versions (
        name TEXT NOT NULL REFERENCES configurations(name),
        version INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        is_rollback INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (name, version)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS version_data (
        name TEXT NOT NULL,
        version INTEGER NOT NULL,
        data TEXT NOT NULL,
        PRIMARY KEY (name, version),
        FOREIGN KEY (name, version) REFERENCES versions(name, version)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS schemas (
        name TEXT PRIMARY KEY,
        schema TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
];

/// Create the configuration tables if they do not exist yet
pub async fn initialize_schema(pool: &SqlitePool) -> DatabaseResult<()> {
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
    }

    info!("Configuration store schema ready");
    Ok(())
}
