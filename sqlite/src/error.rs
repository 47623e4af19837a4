//! Error types for the SQLite schema backend.

use thiserror::Error;
use vehicle_auth_core::SchemaError;

/// Errors that can occur in SQLite schema operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The schema run was aborted (cycle or connection failure).
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
