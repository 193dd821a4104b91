// Database connection management
use crate::error::{DatabaseError, DatabaseResult};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Settings for the SQLite connection pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the database file, created when missing
    pub path: PathBuf,
    pub max_connections: u32,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
    pub enable_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/config.db"),
            max_connections: 5,
            busy_timeout_ms: 5_000,
            enable_wal: true,
        }
    }
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// SQLite connection pool wrapper
#[derive(Clone, Debug)]
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Open (and create if needed) the database described by `config`
    pub async fn new(config: &DatabaseConfig) -> DatabaseResult<Self> {
        ensure_parent_dir(&config.path)?;

        let journal_mode = if config.enable_wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(journal_mode)
            .foreign_keys(true)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(path = %config.path.display(), "Database connection pool created successfully");
        Ok(Self { pool })
    }

    /// Get the underlying SqlitePool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if the pool is healthy
    pub async fn is_healthy(&self) -> bool {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Database health check failed: {}", e);
                false
            }
        }
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

fn ensure_parent_dir(path: &Path) -> DatabaseResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|e| {
                DatabaseError::ConnectionFailed(format!(
                    "cannot create database directory {}: {e}",
                    parent.display()
                ))
            }),
        _ => Ok(()),
    }
}
