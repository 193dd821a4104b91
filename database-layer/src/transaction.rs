// Transaction management
use crate::connection::DatabasePool;
use crate::error::{DatabaseError, DatabaseResult};
use sqlx::{Sqlite, Transaction};
use tracing::debug;

/// Hands out transactions on the shared pool
#[derive(Clone, Debug)]
pub struct TransactionManager {
    pool: DatabasePool,
}

impl TransactionManager {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Begin a new transaction; it rolls back unless committed
    pub async fn begin(&self) -> DatabaseResult<Transaction<'static, Sqlite>> {
        debug!("Beginning transaction");

        self.pool
            .pool()
            .begin()
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to begin transaction: {e}")))
    }

    pub async fn commit(&self, tx: Transaction<'static, Sqlite>) -> DatabaseResult<()> {
        tx.commit()
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to commit transaction: {e}")))?;
        debug!("Transaction committed");
        Ok(())
    }
}
