//! SQLite backend for the vehicle authorization schema.
//!
//! Implements the [`SchemaBackend`](vehicle_auth_core::SchemaBackend) and
//! [`SchemaConnection`](vehicle_auth_core::SchemaConnection) capabilities
//! for SQLite database files and wraps them in a small lifecycle API.
//!
//! # Architecture
//!
//! - **`schema`**: `CREATE TABLE` / `CREATE INDEX` generation
//! - **`introspect`**: metadata lookups through `sqlite_master` and pragmas
//! - **`connection`**: [`SqliteBackend`] and [`SqliteConnection`], including
//!   the table rebuild used to add and drop foreign keys
//! - **`migration`**: [`SchemaMigration`], [`create_schema`], [`verify_schema`]
//!
//! # Quick start
//!
//! ```no_run
//! use vehicle_auth_core::vehicle_authorization_catalog;
//! use vehicle_auth_sqlite::{create_schema, verify_schema};
//!
//! let catalog = vehicle_authorization_catalog().unwrap();
//! let report = create_schema(&catalog, "Database.db").unwrap();
//! println!("{}", report.summary());
//!
//! let verification = verify_schema(&catalog, "Database.db");
//! println!("{} tables, {} relationships", verification.table_count, verification.relationship_count);
//! ```
//!
//! # Locking
//!
//! Schema runs hold an exclusive lock on the database file for their whole
//! duration. A file locked by another connection is waited on for the busy
//! timeout and then reported as
//! [`ConnectionError::Locked`](vehicle_auth_core::ConnectionError::Locked).

mod connection;
mod error;
mod introspect;
mod migration;
mod schema;

pub use connection::{DEFAULT_BUSY_TIMEOUT, SqliteBackend, SqliteConnection};
pub use error::{Result, SqliteError};
pub use migration::{SchemaMigration, SchemaObject, create_schema, verify_schema};
pub use schema::{ColumnShape, ForeignKeyShape, TableShape, column_type, create_index_sql};
