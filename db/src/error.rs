//! Error types for backup and configuration operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while backing up a database or handling config.
#[derive(Debug, Error)]
pub enum DbError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// SQLite failure while taking the read lock on the source.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Another connection holds a lock that prevents a consistent read.
    #[error("database is locked by another connection: {}", .0.display())]
    Locked(PathBuf),

    /// The database to back up does not exist or is not a regular file.
    #[error("source database file not found: {}", .0.display())]
    SourceMissing(PathBuf),

    /// A backup with the same name already exists.
    #[error("backup already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// The copy does not hash to the same value as the source.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Convenience alias for results with [`DbError`].
pub type Result<T> = std::result::Result<T, DbError>;
