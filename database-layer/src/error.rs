use config_engine::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    /// A stored row could not be decoded back into the domain model
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),
}

impl DatabaseError {
    /// True when the error is a primary-key or unique-constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::SqlxError(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }

    pub fn is_row_not_found(&self) -> bool {
        matches!(self, DatabaseError::SqlxError(sqlx::Error::RowNotFound))
    }
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        if err.is_row_not_found() {
            StoreError::NotFound
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
