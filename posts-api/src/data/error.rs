use thiserror::Error;

/// Failures of the persistence collaborators. The services never inspect
/// these, they only pass them through.
#[derive(Debug, Error)]
pub(crate) enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored row is invalid: {0}")]
    InvalidRow(String),

    #[error("entity has not been persisted yet")]
    Detached,
}
