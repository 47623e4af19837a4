use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use tracing::info;
use vehicle_auth_core::{
    ExecutionReport, SchemaCatalog, VerificationReport, creation_order,
    vehicle_authorization_catalog,
};
use vehicle_auth_db::{BackupResult, BackupService, ManagerConfig, format_size};
use vehicle_auth_sqlite::SchemaMigration;

#[derive(Debug, Parser)]
#[command(name = "vehicle-auth")]
#[command(version, about = "Create and verify the vehicle authorization database schema")]
struct Cli {
    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Back up the database, then drop and recreate every table, index and relationship.
    Create(CreateArgs),
    /// Compare the database schema with the catalog.
    Verify(VerifyArgs),
    /// Print the dependency-ordered table creation sequence.
    Order,
    /// Print the catalog's entities and relationships.
    Catalog(CatalogArgs),
    /// Take a one-off backup of the database.
    Backup(BackupArgs),
    /// Summarize the backup directory, optionally pruning old backups.
    Backups(BackupsArgs),
}

#[derive(Debug, Args)]
struct CreateArgs {
    /// Database file path (overrides the configuration).
    #[arg(long)]
    db: Option<PathBuf>,
    /// Skip the pre-run backup.
    #[arg(long)]
    no_backup: bool,
    /// Print the execution report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct VerifyArgs {
    /// Database file path (overrides the configuration).
    #[arg(long)]
    db: Option<PathBuf>,
    /// Print the verification report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct CatalogArgs {
    /// Print the catalog as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct BackupArgs {
    /// Database file path (overrides the configuration).
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct BackupsArgs {
    /// Delete all but the newest KEEP backups.
    #[arg(long, value_name = "KEEP")]
    cleanup: Option<usize>,
}

/// Non-fatal outcome of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    /// Some entities failed or verification found differences.
    Partial,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Command::Create(args) => run_create(&config, args),
        Command::Verify(args) => run_verify(&config, args),
        Command::Order => run_order(),
        Command::Catalog(args) => run_catalog(args),
        Command::Backup(args) => run_backup(&config, args),
        Command::Backups(args) => run_backups(&config, args),
    });

    match result {
        Ok(Outcome::Success) => {}
        Ok(Outcome::Partial) => std::process::exit(2),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ManagerConfig, String> {
    match path {
        Some(path) => ManagerConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display())),
        None => Ok(ManagerConfig::default()),
    }
}

fn catalog() -> Result<SchemaCatalog, String> {
    vehicle_authorization_catalog().map_err(|e| format!("Invalid catalog: {e}"))
}

fn database_path(config: &ManagerConfig, db: Option<PathBuf>) -> PathBuf {
    db.unwrap_or_else(|| config.database_path.clone())
}

fn run_create(config: &ManagerConfig, args: CreateArgs) -> Result<Outcome, String> {
    let catalog = catalog()?;
    let db = database_path(config, args.db);

    let backup = if args.no_backup || !db.exists() {
        None
    } else {
        let service = BackupService::from_config(&config.backup)
            .with_lock_timeout(config.sqlite.busy_timeout());
        let result = service.backup(&db);
        if result.success {
            let removed = service.cleanup(config.backup.keep);
            if removed > 0 {
                info!(removed, "Pruned old backups");
            }
        }
        Some(result)
    };

    let report = SchemaMigration::new(&catalog)
        .with_busy_timeout(config.sqlite.busy_timeout())
        .create(&db)
        .map_err(|e| format!("Schema creation failed for '{}': {e}", db.display()))?;

    if args.json {
        let output = serde_json::json!({
            "database": db,
            "backup": backup,
            "report": report,
        });
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| format!("Failed to serialize report: {e}"))?;
        println!("{text}");
    } else {
        print_backup(backup.as_ref(), args.no_backup);
        print_execution(&db, &report);
    }

    Ok(if report.is_success() {
        Outcome::Success
    } else {
        Outcome::Partial
    })
}

fn print_backup(backup: Option<&BackupResult>, skipped: bool) {
    match backup {
        Some(result) if result.success => {
            let path = result
                .produced_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            println!("Backup: {} -> {path}", result.message);
        }
        // Backup failures never stop the run.
        Some(result) => println!("Backup skipped: {}", result.message),
        None if skipped => println!("Backup: disabled"),
        None => println!("Backup: no existing database"),
    }
}

fn print_execution(db: &Path, report: &ExecutionReport) {
    println!("Database: {}", db.display());
    println!("Creation order: {}", report.creation_order.join(", "));
    println!("Relationships dropped: {}", report.relationships_dropped);
    println!("Entities: {}", report.summary());
    for outcome in &report.entities {
        if let Some(error) = &outcome.error {
            println!("  FAILED {}: {error}", outcome.name);
        }
    }
    println!(
        "Indexes: {} created, {} warnings, {} errors",
        report.indexes_created, report.index_warnings, report.index_errors
    );
    println!(
        "Relationships: {} created, {} warnings, {} errors, {} documented only",
        report.foreign_keys_created,
        report.foreign_key_warnings,
        report.foreign_key_errors,
        report.foreign_keys_skipped
    );
    let warnings: Vec<_> = report.warnings().collect();
    if !warnings.is_empty() {
        println!("Warnings:");
        for issue in warnings {
            println!("  {:?} {}: {}", issue.kind, issue.object, issue.message);
        }
    }
}

fn run_verify(config: &ManagerConfig, args: VerifyArgs) -> Result<Outcome, String> {
    let catalog = catalog()?;
    let db = database_path(config, args.db);
    let report = SchemaMigration::new(&catalog)
        .with_busy_timeout(config.sqlite.busy_timeout())
        .verify(&db);

    if args.json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize report: {e}"))?;
        println!("{text}");
    } else {
        print_verification(&db, &report);
    }

    Ok(if report.success {
        Outcome::Success
    } else {
        Outcome::Partial
    })
}

fn print_verification(db: &Path, report: &VerificationReport) {
    println!("Database: {}", db.display());
    println!(
        "Verification: {}",
        if report.success { "PASSED" } else { "FAILED" }
    );
    if let Some(error) = &report.error {
        println!("Error: {error}");
        return;
    }
    println!("Tables: {}", report.table_count);
    println!("Indexes: {}", report.index_count);
    println!(
        "Relationships: {} ({} of {} expected present)",
        report.relationship_count, report.matched_relationships, report.expected_relationships
    );
    if let Some(central) = &report.central_entity {
        if central.present {
            println!("{}: present, {} fields", central.name, central.field_count);
        } else {
            println!("{}: MISSING", central.name);
        }
    }
    if !report.missing_tables.is_empty() {
        println!("Missing tables: {}", report.missing_tables.join(", "));
    }
    if !report.missing_indexes.is_empty() {
        println!("Missing indexes: {}", report.missing_indexes.join(", "));
    }
    for relationship in &report.missing_relationships {
        println!("Missing relationship: {relationship}");
    }
}

fn run_order() -> Result<Outcome, String> {
    let catalog = catalog()?;
    let order = creation_order(&catalog).map_err(|e| e.to_string())?;
    for (i, name) in order.iter().enumerate() {
        println!("{:>2}. {name}", i + 1);
    }
    Ok(Outcome::Success)
}

fn run_catalog(args: CatalogArgs) -> Result<Outcome, String> {
    let catalog = catalog()?;
    if args.json {
        let text = serde_json::to_string_pretty(&catalog)
            .map_err(|e| format!("Failed to serialize catalog: {e}"))?;
        println!("{text}");
        return Ok(Outcome::Success);
    }

    for entity in catalog.list_entities() {
        println!(
            "{} ({} fields, key: {})",
            entity.name,
            entity.fields.len(),
            entity.primary_key.join(", ")
        );
        if !entity.description.is_empty() {
            println!("    {}", entity.description);
        }
    }
    println!();
    println!("Relationships:");
    for fk in catalog.list_foreign_keys() {
        match &fk.note {
            Some(note) if !fk.is_enforced() => {
                println!("  {} [documented: {note}]", fk.describe());
            }
            _ => println!("  {}", fk.describe()),
        }
    }
    println!();
    println!("Indexes: {}", catalog.list_indexes().len());
    Ok(Outcome::Success)
}

fn run_backup(config: &ManagerConfig, args: BackupArgs) -> Result<Outcome, String> {
    let db = database_path(config, args.db);
    let service = BackupService::from_config(&config.backup)
        .with_lock_timeout(config.sqlite.busy_timeout());
    let result = service.backup(&db);
    if !result.success {
        return Err(result.message);
    }
    print_backup(Some(&result), false);
    if let Some(checksum) = &result.checksum {
        println!("SHA-256: {checksum}");
    }
    Ok(Outcome::Success)
}

fn run_backups(config: &ManagerConfig, args: BackupsArgs) -> Result<Outcome, String> {
    let service = BackupService::from_config(&config.backup);
    if let Some(keep) = args.cleanup {
        let removed = service.cleanup(keep);
        println!("Removed {removed} old backup(s)");
    }

    let info = service.info();
    println!("Directory: {}", service.directory().display());
    println!("{}", info.message);
    if info.available {
        println!("Backups: {}", info.backup_count);
        println!("Total size: {}", format_size(info.total_size));
    }
    Ok(Outcome::Success)
}
