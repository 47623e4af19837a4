//! Schema lifecycle entry points for SQLite database files.
//!
//! # Example
//!
//! ```no_run
//! use vehicle_auth_core::vehicle_authorization_catalog;
//! use vehicle_auth_sqlite::SchemaMigration;
//!
//! let catalog = vehicle_authorization_catalog().unwrap();
//! let migration = SchemaMigration::new(&catalog);
//!
//! let report = migration.create("Database.db").unwrap();
//! println!("{}", report.summary());
//!
//! let verification = migration.verify("Database.db");
//! assert!(verification.success);
//! ```

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use vehicle_auth_core::{
    ExecutionReport, SchemaCatalog, SchemaExecutor, VerificationReport, Verifier,
};

use crate::connection::{DEFAULT_BUSY_TIMEOUT, SqliteBackend};
use crate::error::Result;

/// Creates and verifies the catalog's schema in SQLite database files.
pub struct SchemaMigration<'a> {
    catalog: &'a SchemaCatalog,
    busy_timeout: Duration,
}

impl<'a> SchemaMigration<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self {
            catalog,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Sets how long to wait for a lock held by another connection.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Drops and recreates every catalog table, index and relationship.
    ///
    /// The file is created if missing and held exclusively for the run.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::Schema`](crate::SqliteError::Schema) if the
    /// catalog has a foreign-key cycle or the database cannot be locked.
    /// Per-object failures are reported in the [`ExecutionReport`].
    pub fn create(&self, database: impl AsRef<Path>) -> Result<ExecutionReport> {
        let backend = SqliteBackend::exclusive().with_busy_timeout(self.busy_timeout);
        let report = SchemaExecutor::new(self.catalog).execute(&backend, database.as_ref())?;
        Ok(report)
    }

    /// Compares the database with the catalog using a read-only connection.
    pub fn verify(&self, database: impl AsRef<Path>) -> VerificationReport {
        let backend = SqliteBackend::read_only().with_busy_timeout(self.busy_timeout);
        Verifier::new(self.catalog).verify(&backend, database.as_ref())
    }

    /// Returns `(type, name, sql)` for every schema object, ordered by name.
    ///
    /// Two databases with equal snapshots have identical schemas.
    pub fn snapshot(&self, database: impl AsRef<Path>) -> Result<Vec<SchemaObject>> {
        let conn = Connection::open_with_flags(database.as_ref(), OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        conn.busy_timeout(self.busy_timeout)?;
        let mut stmt = conn.prepare(
            "SELECT type, name, tbl_name, sql FROM sqlite_master ORDER BY type, name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SchemaObject {
                kind: row.get(0)?,
                name: row.get(1)?,
                table: row.get(2)?,
                sql: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

/// One row of `sqlite_master`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaObject {
    pub kind: String,
    pub name: String,
    pub table: String,
    pub sql: Option<String>,
}

/// Creates the catalog's schema in `database` with default settings.
///
/// See [`SchemaMigration::create`].
pub fn create_schema(catalog: &SchemaCatalog, database: impl AsRef<Path>) -> Result<ExecutionReport> {
    SchemaMigration::new(catalog).create(database)
}

/// Verifies `database` against the catalog with default settings.
///
/// See [`SchemaMigration::verify`].
pub fn verify_schema(catalog: &SchemaCatalog, database: impl AsRef<Path>) -> VerificationReport {
    SchemaMigration::new(catalog).verify(database)
}
