//! Read-only reconciliation of a live database against the catalog.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::connection::{RelationshipInfo, SchemaBackend, SchemaConnection, TableMetadata};
use crate::SchemaCatalog;

/// Presence of the catalog's central entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CentralEntityStatus {
    pub name: String,
    pub present: bool,
    pub field_count: usize,
}

/// Outcome of a verification pass.
///
/// Always produced, even when the database could not be read; in that case
/// `error` is set and `success` is `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub success: bool,
    pub error: Option<String>,
    pub table_count: usize,
    pub index_count: usize,
    pub relationship_count: usize,
    pub tables: Vec<String>,
    pub central_entity: Option<CentralEntityStatus>,
    pub missing_tables: Vec<String>,
    pub missing_indexes: Vec<String>,
    /// Enforced catalog foreign keys.
    pub expected_relationships: usize,
    /// Enforced catalog foreign keys found in the database.
    pub matched_relationships: usize,
    pub missing_relationships: Vec<String>,
}

impl VerificationReport {
    fn failed(message: String, expected_relationships: usize) -> Self {
        Self {
            error: Some(message),
            expected_relationships,
            ..Self::default()
        }
    }
}

/// Compares the live schema with a [`SchemaCatalog`].
pub struct Verifier<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> Verifier<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Inspects `database` through `backend`.
    ///
    /// Never fails: connection and metadata errors are carried in
    /// [`VerificationReport::error`].
    pub fn verify<B: SchemaBackend>(&self, backend: &B, database: &Path) -> VerificationReport {
        let expected = self.catalog.enforced_foreign_keys().count();

        let mut conn = match backend.connect(database) {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "Verification could not connect");
                return VerificationReport::failed(e.to_string(), expected);
            }
        };

        let report = match read_schema(&mut conn) {
            Ok((tables, relationships)) => self.reconcile(&tables, &relationships),
            Err(message) => {
                warn!(error = %message, "Verification could not read schema metadata");
                VerificationReport::failed(message, expected)
            }
        };

        if let Err(e) = conn.close() {
            warn!(error = %e, "Failed to release database connection");
        }

        info!(
            success = report.success,
            tables = report.table_count,
            indexes = report.index_count,
            relationships = report.relationship_count,
            "Verification finished"
        );
        report
    }

    /// Builds a report from already-read metadata.
    pub fn reconcile(
        &self,
        tables: &[TableMetadata],
        relationships: &[RelationshipInfo],
    ) -> VerificationReport {
        let live: BTreeSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        let live_indexes: BTreeSet<&str> = tables
            .iter()
            .flat_map(|t| t.indexes.iter().map(String::as_str))
            .collect();

        let missing_tables: Vec<String> = self
            .catalog
            .list_entities()
            .iter()
            .filter(|e| !live.contains(e.name.as_str()))
            .map(|e| e.name.clone())
            .collect();

        let missing_indexes: Vec<String> = self
            .catalog
            .list_indexes()
            .iter()
            .filter(|i| !live_indexes.contains(i.name.as_str()))
            .map(|i| i.name.clone())
            .collect();

        let mut expected_relationships = 0;
        let mut missing_relationships = Vec::new();
        for fk in self.catalog.enforced_foreign_keys() {
            expected_relationships += 1;
            if !relationships.iter().any(|r| r.matches(fk)) {
                debug!(foreign_key = %fk.name, "Relationship missing");
                missing_relationships.push(fk.describe());
            }
        }
        let matched_relationships = expected_relationships - missing_relationships.len();

        let central_entity = self.catalog.central_entity().map(|name| {
            let table = tables.iter().find(|t| t.name == name);
            CentralEntityStatus {
                name: name.to_string(),
                present: table.is_some(),
                field_count: table.map_or(0, |t| t.fields.len()),
            }
        });
        let central_ok = central_entity.as_ref().is_none_or(|c| c.present);

        VerificationReport {
            success: missing_tables.is_empty()
                && missing_indexes.is_empty()
                && missing_relationships.is_empty()
                && central_ok,
            error: None,
            table_count: tables.len(),
            index_count: live_indexes.len(),
            relationship_count: relationships.len(),
            tables: tables.iter().map(|t| t.name.clone()).collect(),
            central_entity,
            missing_tables,
            missing_indexes,
            expected_relationships,
            matched_relationships,
            missing_relationships,
        }
    }
}

fn read_schema<C: SchemaConnection>(
    conn: &mut C,
) -> Result<(Vec<TableMetadata>, Vec<RelationshipInfo>), String> {
    let tables = conn.tables().map_err(|e| e.to_string())?;
    let relationships = conn.relationships().map_err(|e| e.to_string())?;
    Ok((tables, relationships))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::fake::{FakeBackend, two_entity_catalog};
    use crate::{SchemaExecutor, vehicle_authorization_catalog};

    #[test]
    fn test_verify_after_execute() {
        let catalog = vehicle_authorization_catalog().unwrap();
        let backend = FakeBackend::default();
        SchemaExecutor::new(&catalog)
            .execute(&backend, Path::new("test.db"))
            .unwrap();

        let report = Verifier::new(&catalog).verify(&backend, Path::new("test.db"));
        assert!(report.success, "{report:?}");
        assert_eq!(report.table_count, 19);
        assert_eq!(report.index_count, 25);
        assert_eq!(report.relationship_count, 25);
        assert_eq!(report.expected_relationships, 25);
        assert_eq!(report.matched_relationships, 25);

        let central = report.central_entity.unwrap();
        assert_eq!(central.name, "Applications");
        assert!(central.present);
        assert_eq!(central.field_count, 26);
    }

    #[test]
    fn test_empty_database_fails() {
        let catalog = two_entity_catalog();
        let backend = FakeBackend::default();
        let report = Verifier::new(&catalog).verify(&backend, Path::new("test.db"));
        assert!(!report.success);
        assert!(report.error.is_none());
        assert_eq!(report.missing_tables, vec!["Contact", "Address"]);
        assert_eq!(report.missing_indexes, vec!["idx_Contact_AddressID"]);
        assert_eq!(report.missing_relationships.len(), 1);
    }

    #[test]
    fn test_missing_relationship_fails() {
        let catalog = two_entity_catalog();
        let backend = FakeBackend::default();
        SchemaExecutor::new(&catalog)
            .execute(&backend, Path::new("test.db"))
            .unwrap();
        backend.with_state(|state| state.relationships.clear());

        let report = Verifier::new(&catalog).verify(&backend, Path::new("test.db"));
        assert!(!report.success);
        assert_eq!(report.relationship_count, 0);
        assert_eq!(report.matched_relationships, 0);
        assert_eq!(
            report.missing_relationships,
            vec!["Contact(AddressID) -> Address(AddressID)"]
        );
    }

    #[test]
    fn test_extra_tables_are_counted_but_tolerated() {
        let catalog = two_entity_catalog();
        let backend = FakeBackend::default();
        SchemaExecutor::new(&catalog)
            .execute(&backend, Path::new("test.db"))
            .unwrap();
        backend.with_state(|state| {
            state.tables.insert("Scratch".to_string(), vec!["ID".to_string()]);
        });

        let report = Verifier::new(&catalog).verify(&backend, Path::new("test.db"));
        assert!(report.success);
        assert_eq!(report.table_count, 3);
    }

    #[test]
    fn test_connection_failure_yields_report() {
        let catalog = two_entity_catalog();
        let report = Verifier::new(&catalog).verify(&FakeBackend::locked(), Path::new("test.db"));
        assert!(!report.success);
        assert!(report.error.unwrap().contains("locked"));
        assert_eq!(report.expected_relationships, 1);
    }

    #[test]
    fn test_read_failure_yields_report() {
        let catalog = two_entity_catalog();
        let backend = FakeBackend::default();
        backend.fail_reads();
        let report = Verifier::new(&catalog).verify(&backend, Path::new("test.db"));
        assert!(!report.success);
        assert!(report.error.is_some());
        assert!(backend.state().closed);
    }
}
