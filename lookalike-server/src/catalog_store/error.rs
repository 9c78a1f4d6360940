//! Error types for the catalog store module.

use lookalike_core::LookalikeError;
use thiserror::Error;

/// Errors that can occur when interacting with the catalog store.
#[derive(Debug, Error)]
pub enum CatalogStoreError {
    /// Database connection failed
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// SQL query execution failed
    #[error("Query error: {0}")]
    Query(String),

    /// A stored row could not be turned into a catalog entry
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// An entry with the same hash already exists
    #[error("Duplicate hash: {0}")]
    Duplicate(String),
}

impl From<sqlx::Error> for CatalogStoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Query(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for CatalogStoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(e.to_string())
    }
}

impl From<CatalogStoreError> for LookalikeError {
    fn from(e: CatalogStoreError) -> Self {
        match e {
            CatalogStoreError::Duplicate(hash) => LookalikeError::DuplicateHash(hash),
            other => LookalikeError::Storage(other.to_string()),
        }
    }
}
