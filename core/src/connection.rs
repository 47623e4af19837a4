//! Schema capability interface.
//!
//! The executor and verifier never talk to a concrete database driver. They
//! work against [`SchemaBackend`] (opens a session on a database file) and
//! [`SchemaConnection`] (the DDL and metadata operations the lifecycle
//! needs). Object-level failures carry an [`ObjectErrorKind`] so benign
//! conditions such as "already exists" are recognized structurally rather
//! than by matching engine messages.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::{EntityDefinition, ForeignKeyDefinition, IndexDefinition};

/// The target database could not be opened for a session.
///
/// Fatal for the run that attempted to connect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The database file does not exist and the backend will not create it.
    #[error("database file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Another process or connection holds a conflicting lock.
    #[error("database is locked by another connection: {}", .0.display())]
    Locked(PathBuf),
    /// The engine refused or failed to open the database.
    #[error("cannot open database {}: {message}", path.display())]
    Open { path: PathBuf, message: String },
}

/// Classification of an object-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObjectErrorKind {
    /// The object to create is already present.
    AlreadyExists,
    /// The object to drop, or an object the operation needs, is absent.
    NotFound,
    /// The name is taken by an object of a different kind.
    Conflict,
    /// Any other engine failure.
    Engine,
}

/// Failure of a single DDL or metadata operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?} on {object}: {message}")]
pub struct ObjectError {
    pub kind: ObjectErrorKind,
    pub object: String,
    pub message: String,
}

impl ObjectError {
    pub fn new(kind: ObjectErrorKind, object: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            object: object.into(),
            message: message.into(),
        }
    }

    pub fn already_exists(object: impl Into<String>) -> Self {
        let object = object.into();
        let message = format!("{object} already exists");
        Self::new(ObjectErrorKind::AlreadyExists, object, message)
    }

    pub fn not_found(object: impl Into<String>) -> Self {
        let object = object.into();
        let message = format!("{object} does not exist");
        Self::new(ObjectErrorKind::NotFound, object, message)
    }

    pub fn engine(object: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ObjectErrorKind::Engine, object, message)
    }

    /// `true` for failures the executor downgrades to warnings when creating.
    pub fn is_already_exists(&self) -> bool {
        self.kind == ObjectErrorKind::AlreadyExists
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ObjectErrorKind::NotFound
    }
}

/// A relationship present in the live database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipInfo {
    pub child_table: String,
    pub child_fields: Vec<String>,
    pub parent_table: String,
    pub parent_fields: Vec<String>,
}

impl RelationshipInfo {
    /// Returns `true` if `fk` describes this relationship.
    pub fn matches(&self, fk: &ForeignKeyDefinition) -> bool {
        self.child_table == fk.child_entity
            && self.parent_table == fk.parent_entity
            && self.child_fields == fk.child_fields
            && self.parent_fields == fk.parent_fields
    }

    pub fn describe(&self) -> String {
        format!(
            "{}({}) -> {}({})",
            self.child_table,
            self.child_fields.join(", "),
            self.parent_table,
            self.parent_fields.join(", ")
        )
    }
}

/// A user table present in the live database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMetadata {
    pub name: String,
    pub fields: Vec<String>,
    /// Explicitly created indexes; engine-generated key indexes are excluded.
    pub indexes: Vec<String>,
}

/// Opens schema sessions on a database file.
pub trait SchemaBackend {
    type Connection: SchemaConnection;

    /// Opens a session on `database`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] if the engine is unreachable, the file is
    /// missing (for backends that do not create it) or locked.
    fn connect(&self, database: &Path) -> Result<Self::Connection, ConnectionError>;
}

/// DDL and metadata operations on an open session.
///
/// Implementations release the session when dropped; [`close`](Self::close)
/// releases it explicitly and reports failures.
pub trait SchemaConnection {
    /// Enumerates all non-system relationships.
    fn relationships(&mut self) -> Result<Vec<RelationshipInfo>, ObjectError>;

    /// Removes one relationship.
    fn drop_relationship(&mut self, relationship: &RelationshipInfo) -> Result<(), ObjectError>;

    /// Drops a table; [`ObjectErrorKind::NotFound`] if there is none.
    fn drop_table(&mut self, name: &str) -> Result<(), ObjectError>;

    /// Creates the table for `entity`.
    fn create_table(&mut self, entity: &EntityDefinition) -> Result<(), ObjectError>;

    fn create_index(&mut self, index: &IndexDefinition) -> Result<(), ObjectError>;

    fn create_foreign_key(&mut self, fk: &ForeignKeyDefinition) -> Result<(), ObjectError>;

    /// Enumerates user tables, excluding engine-internal objects.
    fn tables(&mut self) -> Result<Vec<TableMetadata>, ObjectError>;

    /// Releases the session.
    fn close(self) -> Result<(), ObjectError>
    where
        Self: Sized;
}
