use std::sync::PoisonError;
use thiserror::Error;

/// Errors surfaced by the catalog store and everything built on it.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Migration to version {version} failed: {source:#}")]
    MigrationFailed {
        version: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        CatalogError::NotFound { entity, id }
    }

    /// Whether the caller may retry the operation that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CatalogError::StorageUnavailable(_) | CatalogError::IntegrityViolation(_)
        )
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                CatalogError::IntegrityViolation(err.to_string())
            }
            _ => CatalogError::StorageUnavailable(err.to_string()),
        }
    }
}

impl<T> From<PoisonError<T>> for CatalogError {
    fn from(err: PoisonError<T>) -> Self {
        CatalogError::StorageUnavailable(format!("lock poisoned: {}", err))
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
