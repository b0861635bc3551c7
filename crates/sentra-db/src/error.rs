//! Database-specific error types and conversions.

use sentra_core::error::SentraError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid stored value: {0}")]
    Corrupt(String),
}

impl From<DbError> for SentraError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => SentraError::NotFound { entity, id },
            other => SentraError::Database(other.to_string()),
        }
    }
}
