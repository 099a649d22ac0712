use common::CorrelationId;
use thiserror::Error;

/// Errors that can occur when interacting with the correlation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected a state record insert.
    #[error("correlation id {0} already has a state record")]
    DuplicateCorrelation(CorrelationId),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A backend failure outside the database error surface.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Result type for correlation store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
