//! Applies the catalog to a live database.
//!
//! A run is destructive-then-reconstructive:
//!
//! 1. compute the creation order (a cycle aborts before connecting)
//! 2. connect (failure aborts the run)
//! 3. drop every existing relationship
//! 4. for each entity in order, drop the table if present and create it
//! 5. create indexes
//! 6. create enforced foreign keys in catalog order
//! 7. disconnect
//!
//! Only steps 1 and 2 can fail the run. Steps 3 to 6 record problems in the
//! [`ExecutionReport`] and keep going, so one bad definition never hides the
//! state of the others.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::connection::{ObjectError, SchemaBackend, SchemaConnection};
use crate::error::Result;
use crate::{SchemaCatalog, creation_order};

/// Category of a problem recorded during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueKind {
    /// Enumerating or dropping an existing relationship failed.
    RelationshipDrop,
    /// Dropping an existing table failed for a reason other than absence.
    TableDrop,
    /// An entity's table could not be created.
    EntityCreation,
    /// Index already present.
    IndexWarning,
    /// Index creation failed.
    IndexError,
    /// Relationship already present.
    ForeignKeyWarning,
    /// Relationship creation failed.
    ForeignKeyError,
    /// Releasing the connection failed.
    Disconnect,
}

impl IssueKind {
    /// Returns `true` for hard failures, `false` for warnings.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            IssueKind::EntityCreation | IssueKind::IndexError | IssueKind::ForeignKeyError
        )
    }
}

/// A warning or error attached to a named schema object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaIssue {
    pub kind: IssueKind,
    pub object: String,
    pub message: String,
}

/// Result of creating one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityOutcome {
    pub name: String,
    /// `None` when the table was created.
    pub error: Option<String>,
}

impl EntityOutcome {
    pub fn is_created(&self) -> bool {
        self.error.is_none()
    }
}

/// Structured outcome of a schema run.
///
/// Partial success is representable: [`summary`](Self::summary) reads
/// e.g. `"15 of 19 entities created, 4 failed"`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    pub creation_order: Vec<String>,
    pub relationships_dropped: usize,
    pub entities: Vec<EntityOutcome>,
    pub indexes_created: usize,
    pub index_warnings: usize,
    pub index_errors: usize,
    pub foreign_keys_created: usize,
    pub foreign_key_warnings: usize,
    pub foreign_key_errors: usize,
    /// Documented-only foreign keys that were intentionally not created.
    pub foreign_keys_skipped: usize,
    pub issues: Vec<SchemaIssue>,
}

impl ExecutionReport {
    pub fn entities_created(&self) -> usize {
        self.entities.iter().filter(|e| e.is_created()).count()
    }

    pub fn entities_failed(&self) -> usize {
        self.entities.len() - self.entities_created()
    }

    /// Names of the entities whose tables were created, in creation order.
    pub fn created_entities(&self) -> Vec<&str> {
        self.entities
            .iter()
            .filter(|e| e.is_created())
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn failed_entities(&self) -> Vec<&str> {
        self.entities
            .iter()
            .filter(|e| !e.is_created())
            .map(|e| e.name.as_str())
            .collect()
    }

    /// `true` when every entity was created.
    ///
    /// Index and foreign-key problems are reported but do not affect this.
    pub fn is_success(&self) -> bool {
        self.entities_failed() == 0
    }

    pub fn warnings(&self) -> impl Iterator<Item = &SchemaIssue> {
        self.issues.iter().filter(|i| !i.kind.is_error())
    }

    pub fn errors(&self) -> impl Iterator<Item = &SchemaIssue> {
        self.issues.iter().filter(|i| i.kind.is_error())
    }

    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} of {} entities created",
            self.entities_created(),
            self.entities.len()
        );
        if self.entities_failed() > 0 {
            line.push_str(&format!(", {} failed", self.entities_failed()));
        }
        line
    }

    fn record(&mut self, kind: IssueKind, err: &ObjectError) {
        self.issues.push(SchemaIssue {
            kind,
            object: err.object.clone(),
            message: err.message.clone(),
        });
    }
}

/// Applies a [`SchemaCatalog`] through a [`SchemaBackend`].
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use vehicle_auth_core::{SchemaBackend, SchemaExecutor, vehicle_authorization_catalog};
///
/// fn run<B: SchemaBackend>(backend: &B) {
///     let catalog = vehicle_authorization_catalog().unwrap();
///     let report = SchemaExecutor::new(&catalog)
///         .execute(backend, Path::new("Database.db"))
///         .unwrap();
///     println!("{}", report.summary());
/// }
/// ```
pub struct SchemaExecutor<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> SchemaExecutor<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Runs the full drop-and-recreate sequence against `database`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Cycle`](crate::SchemaError::Cycle) before any
    /// mutation if the catalog cannot be ordered, and
    /// [`SchemaError::Connection`](crate::SchemaError::Connection) if the
    /// session cannot be opened. All other failures are in the report.
    pub fn execute<B: SchemaBackend>(&self, backend: &B, database: &Path) -> Result<ExecutionReport> {
        let order = creation_order(self.catalog)?;
        info!(
            database = %database.display(),
            entities = order.len(),
            "Starting schema run"
        );

        let mut conn = backend.connect(database)?;
        let mut report = ExecutionReport {
            creation_order: order,
            ..ExecutionReport::default()
        };

        self.apply(&mut conn, &mut report);

        if let Err(e) = conn.close() {
            warn!(error = %e, "Failed to release database connection");
            report.record(IssueKind::Disconnect, &e);
        }

        info!(
            summary = %report.summary(),
            indexes = report.indexes_created,
            foreign_keys = report.foreign_keys_created,
            "Schema run finished"
        );
        Ok(report)
    }

    /// Runs steps 3 to 6 on an already open connection.
    pub fn apply<C: SchemaConnection>(&self, conn: &mut C, report: &mut ExecutionReport) {
        self.drop_relationships(conn, report);
        self.recreate_entities(conn, report);
        self.create_indexes(conn, report);
        self.create_foreign_keys(conn, report);
    }

    fn drop_relationships<C: SchemaConnection>(&self, conn: &mut C, report: &mut ExecutionReport) {
        let relationships = match conn.relationships() {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "Cannot enumerate existing relationships");
                report.record(IssueKind::RelationshipDrop, &e);
                return;
            }
        };

        for rel in &relationships {
            match conn.drop_relationship(rel) {
                Ok(()) => {
                    debug!(relationship = %rel.describe(), "Dropped relationship");
                    report.relationships_dropped += 1;
                }
                Err(e) => {
                    warn!(relationship = %rel.describe(), error = %e, "Failed to drop relationship");
                    report.record(IssueKind::RelationshipDrop, &e);
                }
            }
        }
    }

    fn recreate_entities<C: SchemaConnection>(&self, conn: &mut C, report: &mut ExecutionReport) {
        let order = report.creation_order.clone();
        for name in &order {
            let Some(entity) = self.catalog.entity(name) else {
                continue;
            };

            match conn.drop_table(name) {
                Ok(()) => debug!(table = %name, "Dropped existing table"),
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    warn!(table = %name, error = %e, "Failed to drop existing table");
                    report.record(IssueKind::TableDrop, &e);
                }
            }

            match conn.create_table(entity) {
                Ok(()) => {
                    debug!(table = %name, fields = entity.fields.len(), "Created table");
                    report.entities.push(EntityOutcome {
                        name: name.clone(),
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(table = %name, error = %e, "Failed to create table");
                    report.record(IssueKind::EntityCreation, &e);
                    report.entities.push(EntityOutcome {
                        name: name.clone(),
                        error: Some(e.message),
                    });
                }
            }
        }
    }

    fn create_indexes<C: SchemaConnection>(&self, conn: &mut C, report: &mut ExecutionReport) {
        for index in self.catalog.list_indexes() {
            match conn.create_index(index) {
                Ok(()) => report.indexes_created += 1,
                Err(e) if e.is_already_exists() => {
                    debug!(index = %index.name, "Index already exists");
                    report.index_warnings += 1;
                    report.record(IssueKind::IndexWarning, &e);
                }
                Err(e) => {
                    warn!(index = %index.name, error = %e, "Failed to create index");
                    report.index_errors += 1;
                    report.record(IssueKind::IndexError, &e);
                }
            }
        }
    }

    fn create_foreign_keys<C: SchemaConnection>(&self, conn: &mut C, report: &mut ExecutionReport) {
        for fk in self.catalog.list_foreign_keys() {
            if !fk.is_enforced() {
                debug!(foreign_key = %fk.name, "Skipping documented relationship");
                report.foreign_keys_skipped += 1;
                continue;
            }
            match conn.create_foreign_key(fk) {
                Ok(()) => report.foreign_keys_created += 1,
                Err(e) if e.is_already_exists() => {
                    debug!(foreign_key = %fk.name, "Relationship already exists");
                    report.foreign_key_warnings += 1;
                    report.record(IssueKind::ForeignKeyWarning, &e);
                }
                Err(e) => {
                    warn!(foreign_key = %fk.name, error = %e, "Failed to create relationship");
                    report.foreign_key_errors += 1;
                    report.record(IssueKind::ForeignKeyError, &e);
                }
            }
        }
    }
}
