//! Errors that abort a schema run.
//!
//! Everything else (per-entity creation failures, index and foreign-key
//! warnings) is accumulated in the [`ExecutionReport`](crate::ExecutionReport).

use thiserror::Error;

use crate::{ConnectionError, SchemaCycleError};

/// Fatal schema run failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The catalog's foreign-key graph is not acyclic. Raised before connecting.
    #[error(transparent)]
    Cycle(#[from] SchemaCycleError),

    /// The database could not be opened.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;
