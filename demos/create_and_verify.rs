//! Schema lifecycle example.
//!
//! Builds the vehicle authorization schema in a scratch SQLite file, backs
//! it up, runs the creation a second time and verifies the result.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p vehicle-auth-demos --example create_and_verify
//! ```

use vehicle_auth_core::{creation_order, vehicle_authorization_catalog};
use vehicle_auth_db::BackupService;
use vehicle_auth_sqlite::SchemaMigration;

fn main() {
    let work_dir = std::env::temp_dir().join("vehicle_auth_example");
    let _ = std::fs::remove_dir_all(&work_dir);
    std::fs::create_dir_all(&work_dir).unwrap();
    let db_path = work_dir.join("Database.db");

    // === Step 1: Inspect the catalog ===
    println!("=== Catalog ===");
    let catalog = vehicle_authorization_catalog().unwrap();
    println!(
        "{} entities, {} indexes, {} relationships ({} enforced)",
        catalog.list_entities().len(),
        catalog.list_indexes().len(),
        catalog.list_foreign_keys().len(),
        catalog.enforced_foreign_keys().count()
    );
    let order = creation_order(&catalog).unwrap();
    println!("Creation order: {}", order.join(" -> "));

    // === Step 2: First run on an empty file ===
    println!("\n=== First run ===");
    let migration = SchemaMigration::new(&catalog);
    let report = migration.create(&db_path).unwrap();
    println!("{}", report.summary());
    println!(
        "Indexes: {}, relationships: {}",
        report.indexes_created, report.foreign_keys_created
    );

    // === Step 3: Add a row, back up, and run again ===
    println!("\n=== Backup ===");
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    conn.execute(
        "INSERT INTO \"Addresses\" (\"AddressID\", \"City\") VALUES (?1, ?2)",
        ["addr-1", "Valenciennes"],
    )
    .unwrap();
    drop(conn);

    let backups = BackupService::new(work_dir.join("Backup Database"), "Database-Backup");
    let backup = backups.backup(&db_path);
    println!("{}", backup.message);
    if let Some(path) = &backup.produced_path {
        println!("  -> {}", path.display());
    }

    println!("\n=== Second run ===");
    let report = migration.create(&db_path).unwrap();
    println!(
        "{} (dropped {} relationships first)",
        report.summary(),
        report.relationships_dropped
    );

    // === Step 4: Verify ===
    println!("\n=== Verification ===");
    let verification = migration.verify(&db_path);
    println!("{}", serde_json::to_string_pretty(&verification).unwrap());

    // === Cleanup ===
    std::fs::remove_dir_all(&work_dir).ok();
    println!("\nDone.");
}
