//! Integration tests for the vehicle-auth-sqlite crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tempfile::TempDir;
use vehicle_auth_core::{
    ConnectionError, EntityDefinition, FieldDefinition, ForeignKeyDefinition, IndexDefinition,
    IssueKind, SchemaCatalog, SchemaError, vehicle_authorization_catalog,
};
use vehicle_auth_sqlite::{SchemaMigration, SqliteError, create_schema, verify_schema};

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("Database.db")
}

fn scalar(path: &Path, sql: &str) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

/// The two-entity example: `Contact` references `Address`.
fn address_contact_catalog() -> SchemaCatalog {
    SchemaCatalog::builder()
        .entity(
            EntityDefinition::new("Contact", "People")
                .with_field(FieldDefinition::short_text("ContactID", 50))
                .with_field(FieldDefinition::short_text("Name", 100))
                .with_field(FieldDefinition::short_text("AddressID", 50))
                .with_primary_key(&["ContactID"]),
        )
        .entity(
            EntityDefinition::new("Address", "Postal addresses")
                .with_field(FieldDefinition::short_text("AddressID", 50))
                .with_field(FieldDefinition::short_text("Street", 255))
                .with_primary_key(&["AddressID"]),
        )
        .index(IndexDefinition::on("Contact", "AddressID"))
        .foreign_key(ForeignKeyDefinition::new(
            "FK_Contact_Address",
            "Contact",
            "AddressID",
            "Address",
            "AddressID",
        ))
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Full catalog
// ---------------------------------------------------------------------------

#[test]
fn test_full_catalog_creates_and_verifies() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let catalog = vehicle_authorization_catalog().unwrap();

    let report = create_schema(&catalog, &path).unwrap();
    assert!(report.is_success());
    assert_eq!(report.entities_created(), 19);
    assert_eq!(report.indexes_created, 25);
    assert_eq!(report.foreign_keys_created, 25);
    assert_eq!(report.foreign_keys_skipped, 1);
    assert_eq!(report.summary(), "19 of 19 entities created");

    let verification = verify_schema(&catalog, &path);
    assert!(verification.success, "{verification:?}");
    assert_eq!(verification.table_count, 19);
    assert_eq!(verification.index_count, 25);
    assert_eq!(verification.relationship_count, 25);
    assert!(verification.missing_tables.is_empty());
    assert!(verification.missing_indexes.is_empty());

    let central = verification.central_entity.unwrap();
    assert_eq!(central.name, "Applications");
    assert!(central.present);
    assert_eq!(central.field_count, 26);
}

#[test]
fn test_foreign_keys_are_enforced() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let catalog = vehicle_authorization_catalog().unwrap();
    create_schema(&catalog, &path).unwrap();

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    let orphan = conn.execute(
        "INSERT INTO \"Issues\" (\"IssueID\", \"ApplicationID\") VALUES ('i1', 'nope')",
        [],
    );
    assert!(orphan.is_err());

    // The authorization holder relationship is documentation only.
    conn.execute_batch(
        "INSERT INTO \"Applications\" (\"ApplicationID\") VALUES ('a1');
         INSERT INTO \"VehicleTypes\" (\"VehicleTypeID\", \"ApplicationID\", \"AuthorizationHolderID\")
         VALUES ('v1', 'a1', 'unregistered-body');",
    )
    .unwrap();
}

#[test]
fn test_second_run_produces_identical_schema() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let catalog = vehicle_authorization_catalog().unwrap();
    let migration = SchemaMigration::new(&catalog);

    migration.create(&path).unwrap();
    let first = migration.snapshot(&path).unwrap();

    let report = migration.create(&path).unwrap();
    assert!(report.is_success());
    assert_eq!(report.relationships_dropped, 25);
    assert_eq!(report.index_warnings, 0);
    assert_eq!(report.foreign_key_warnings, 0);

    let second = migration.snapshot(&path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_rerun_discards_rows() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let catalog = vehicle_authorization_catalog().unwrap();
    create_schema(&catalog, &path).unwrap();

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("INSERT INTO \"Addresses\" (\"AddressID\") VALUES ('a1');")
        .unwrap();
    drop(conn);

    create_schema(&catalog, &path).unwrap();
    assert_eq!(scalar(&path, "SELECT COUNT(*) FROM \"Addresses\""), 0);
}

// ---------------------------------------------------------------------------
// Two-entity example
// ---------------------------------------------------------------------------

#[test]
fn test_address_contact_example() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let catalog = address_contact_catalog();

    let report = create_schema(&catalog, &path).unwrap();
    assert_eq!(report.creation_order, vec!["Address", "Contact"]);
    assert_eq!(report.created_entities(), vec!["Address", "Contact"]);

    let verification = verify_schema(&catalog, &path);
    assert!(verification.success);
    assert_eq!(verification.table_count, 2);
    assert_eq!(verification.relationship_count, 1);
    assert_eq!(verification.index_count, 1);
    assert!(verification.central_entity.is_none());
}

#[test]
fn test_report_serializes_to_json() {
    let dir = TempDir::new().unwrap();
    let catalog = address_contact_catalog();
    let report = create_schema(&catalog, db_path(&dir)).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["creation_order"][1], "Contact");
    assert_eq!(json["foreign_keys_created"], 1);
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[test]
fn test_cycle_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let entity = |name: &str| {
        EntityDefinition::new(name, "")
            .with_field(FieldDefinition::short_text("ID", 50))
            .with_field(FieldDefinition::short_text("OtherID", 50))
            .with_primary_key(&["ID"])
    };
    let catalog = SchemaCatalog::builder()
        .entity(entity("Left"))
        .entity(entity("Right"))
        .foreign_key(ForeignKeyDefinition::new("FK_Left_Right", "Left", "OtherID", "Right", "ID"))
        .foreign_key(ForeignKeyDefinition::new("FK_Right_Left", "Right", "OtherID", "Left", "ID"))
        .build()
        .unwrap();

    let err = create_schema(&catalog, &path).unwrap_err();
    match err {
        SqliteError::Schema(SchemaError::Cycle(cycle)) => {
            assert_eq!(cycle.entities, vec!["Left", "Right"]);
        }
        other => panic!("expected cycle error, got {other}"),
    }
    assert!(!path.exists());
}

#[test]
fn test_one_entity_failure_does_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE VIEW \"Documents\" AS SELECT 1 AS \"DocumentID\";")
        .unwrap();
    drop(conn);

    let catalog = vehicle_authorization_catalog().unwrap();
    let report = create_schema(&catalog, &path).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failed_entities(), vec!["Documents"]);
    assert_eq!(report.entities_created(), 18);
    assert_eq!(report.summary(), "18 of 19 entities created, 1 failed");
    assert_eq!(report.indexes_created, 25);
    assert_eq!(report.foreign_keys_created, 23);
    assert_eq!(report.foreign_key_errors, 2);
    assert!(report.issues.iter().any(|i| i.kind == IssueKind::TableDrop));

    let verification = verify_schema(&catalog, &path);
    assert!(!verification.success);
    assert_eq!(verification.table_count, 18);
    assert_eq!(verification.missing_tables, vec!["Documents"]);
    assert_eq!(verification.missing_relationships.len(), 2);
}

#[test]
fn test_locked_database_is_a_connection_error() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let holder = Connection::open(&path).unwrap();
    holder.execute_batch("BEGIN EXCLUSIVE;").unwrap();

    let catalog = address_contact_catalog();
    let err = SchemaMigration::new(&catalog)
        .with_busy_timeout(Duration::ZERO)
        .create(&path)
        .unwrap_err();
    assert!(matches!(
        err,
        SqliteError::Schema(SchemaError::Connection(ConnectionError::Locked(_)))
    ));

    holder.execute_batch("COMMIT;").unwrap();
    drop(holder);
    assert!(create_schema(&catalog, &path).unwrap().is_success());
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

#[test]
fn test_verify_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let catalog = vehicle_authorization_catalog().unwrap();

    let verification = verify_schema(&catalog, &path);
    assert!(!verification.success);
    assert!(verification.error.unwrap().contains("not found"));
    assert_eq!(verification.expected_relationships, 25);
    assert!(!path.exists());
}

#[test]
fn test_verify_reports_dropped_index() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let catalog = vehicle_authorization_catalog().unwrap();
    create_schema(&catalog, &path).unwrap();

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("DROP INDEX \"idx_Issues_IssueStatus\";").unwrap();
    drop(conn);

    let verification = verify_schema(&catalog, &path);
    assert!(!verification.success);
    assert_eq!(verification.index_count, 24);
    assert_eq!(verification.missing_indexes, vec!["idx_Issues_IssueStatus"]);
    assert!(verification.missing_tables.is_empty());
}

#[test]
fn test_verify_empty_database() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE \"Unrelated\" (\"ID\" TEXT);")
        .unwrap();

    let catalog = vehicle_authorization_catalog().unwrap();
    let verification = verify_schema(&catalog, &path);
    assert!(!verification.success);
    assert!(verification.error.is_none());
    assert_eq!(verification.table_count, 1);
    assert_eq!(verification.missing_tables.len(), 19);
    assert!(!verification.central_entity.unwrap().present);
}
