//! [`SchemaBackend`] implementation on top of `rusqlite`.
//!
//! SQLite cannot add or drop a foreign key with `ALTER TABLE`, so both go
//! through the table rebuild procedure: create a replacement table with the
//! new clause set, copy the rows, drop the original, rename the replacement
//! and restore the original's indexes. Foreign-key enforcement is switched
//! off for the duration and switched back on afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, ErrorCode, OpenFlags};
use tracing::debug;
use vehicle_auth_core::{
    ConnectionError, EntityDefinition, ForeignKeyDefinition, IndexDefinition, ObjectError,
    ObjectErrorKind, RelationshipInfo, SchemaBackend, SchemaConnection, TableMetadata,
};

use crate::introspect;
use crate::schema::{ForeignKeyShape, TableShape, create_index_sql, quote};

/// Default time to wait for a lock held by another connection.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessMode {
    Exclusive,
    ReadOnly,
}

/// Opens SQLite database files for schema work.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use std::time::Duration;
/// use vehicle_auth_core::{SchemaExecutor, vehicle_authorization_catalog};
/// use vehicle_auth_sqlite::SqliteBackend;
///
/// let catalog = vehicle_authorization_catalog().unwrap();
/// let backend = SqliteBackend::exclusive().with_busy_timeout(Duration::from_secs(2));
/// let report = SchemaExecutor::new(&catalog)
///     .execute(&backend, Path::new("Database.db"))
///     .unwrap();
/// println!("{}", report.summary());
/// ```
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    mode: AccessMode,
    busy_timeout: Duration,
}

impl SqliteBackend {
    /// Read/write access holding an exclusive lock for the whole session.
    /// The database file is created if missing.
    pub fn exclusive() -> Self {
        Self {
            mode: AccessMode::Exclusive,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Read-only access to an existing database file.
    pub fn read_only() -> Self {
        Self {
            mode: AccessMode::ReadOnly,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    fn open(&self, database: &Path) -> rusqlite::Result<Connection> {
        let conn = match self.mode {
            AccessMode::Exclusive => Connection::open_with_flags(
                database,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            )?,
            AccessMode::ReadOnly => {
                Connection::open_with_flags(database, OpenFlags::SQLITE_OPEN_READ_ONLY)?
            }
        };
        conn.busy_timeout(self.busy_timeout)?;

        if self.mode == AccessMode::Exclusive {
            conn.query_row("PRAGMA locking_mode = EXCLUSIVE", [], |row| {
                row.get::<_, String>(0)
            })?;
            // The lock taken here is kept until the connection closes.
            conn.execute_batch("BEGIN EXCLUSIVE; COMMIT;")?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        } else {
            // Force a read so a locked or non-database file fails here.
            conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })?;
        }
        Ok(conn)
    }
}

impl Default for SqliteBackend {
    fn default() -> Self {
        Self::exclusive()
    }
}

fn connection_error(database: &Path, err: rusqlite::Error) -> ConnectionError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            ConnectionError::Locked(database.to_path_buf())
        }
        _ => ConnectionError::Open {
            path: database.to_path_buf(),
            message: err.to_string(),
        },
    }
}

impl SchemaBackend for SqliteBackend {
    type Connection = SqliteConnection;

    fn connect(&self, database: &Path) -> Result<SqliteConnection, ConnectionError> {
        if self.mode == AccessMode::ReadOnly && !database.exists() {
            return Err(ConnectionError::NotFound(database.to_path_buf()));
        }
        let conn = self
            .open(database)
            .map_err(|e| connection_error(database, e))?;
        debug!(database = %database.display(), mode = ?self.mode, "Opened database");
        Ok(SqliteConnection {
            conn,
            path: database.to_path_buf(),
        })
    }
}

/// An open schema session on a SQLite database.
pub struct SqliteConnection {
    conn: Connection,
    path: PathBuf,
}

fn engine(object: &str) -> impl Fn(rusqlite::Error) -> ObjectError + '_ {
    move |e| ObjectError::engine(object, e.to_string())
}

impl SqliteConnection {
    /// The underlying `rusqlite` connection.
    pub fn inner(&self) -> &Connection {
        &self.conn
    }

    fn require_table(&self, name: &str) -> Result<(), ObjectError> {
        match introspect::object_type(&self.conn, name).map_err(engine(name))? {
            Some(kind) if kind == "table" => Ok(()),
            Some(kind) => Err(ObjectError::new(
                ObjectErrorKind::Conflict,
                name,
                format!("{name} is a {kind}, not a table"),
            )),
            None => Err(ObjectError::not_found(name)),
        }
    }

    fn shape(&self, table: &str) -> Result<TableShape, ObjectError> {
        introspect::table_shape(&self.conn, table)
            .map_err(engine(table))?
            .ok_or_else(|| ObjectError::not_found(table))
    }

    /// Replaces a table by one with `shape`, keeping rows and indexes.
    fn rebuild(&mut self, shape: &TableShape) -> Result<(), ObjectError> {
        let table = shape.name.as_str();
        let indexes = introspect::index_sql(&self.conn, table).map_err(engine(table))?;

        self.conn
            .execute_batch("PRAGMA foreign_keys = OFF;")
            .map_err(engine(table))?;
        let outcome = rebuild_table(&mut self.conn, shape, &indexes);
        let restore = self.conn.execute_batch("PRAGMA foreign_keys = ON;");

        outcome.map_err(engine(table))?;
        restore.map_err(engine(table))?;
        debug!(table, foreign_keys = shape.foreign_keys.len(), "Rebuilt table");
        Ok(())
    }
}

fn rebuild_table(conn: &mut Connection, shape: &TableShape, indexes: &[String]) -> rusqlite::Result<()> {
    let scratch = format!("{}__rebuild", shape.name);
    let tx = conn.transaction()?;
    tx.execute_batch(&shape.create_sql_as(&scratch))?;
    tx.execute_batch(&format!(
        "INSERT INTO {} SELECT * FROM {};",
        quote(&scratch),
        quote(&shape.name)
    ))?;
    tx.execute_batch(&format!("DROP TABLE {};", quote(&shape.name)))?;
    tx.execute_batch(&format!(
        "ALTER TABLE {} RENAME TO {};",
        quote(&scratch),
        quote(&shape.name)
    ))?;
    for sql in indexes {
        tx.execute_batch(sql)?;
    }
    tx.commit()
}

impl SchemaConnection for SqliteConnection {
    fn relationships(&mut self) -> Result<Vec<RelationshipInfo>, ObjectError> {
        let tables = introspect::user_tables(&self.conn).map_err(engine("sqlite_master"))?;
        let mut list = Vec::new();
        for table in tables {
            let fks = introspect::foreign_keys(&self.conn, &table).map_err(engine(&table))?;
            for fk in fks {
                list.push(RelationshipInfo {
                    child_table: table.clone(),
                    child_fields: fk.from,
                    parent_table: fk.parent,
                    parent_fields: fk.to,
                });
            }
        }
        Ok(list)
    }

    fn drop_relationship(&mut self, relationship: &RelationshipInfo) -> Result<(), ObjectError> {
        let mut shape = self.shape(&relationship.child_table)?;
        let clause = ForeignKeyShape {
            parent: relationship.parent_table.clone(),
            from: relationship.child_fields.clone(),
            to: relationship.parent_fields.clone(),
        };
        if !shape.remove_foreign_key(&clause) {
            return Err(ObjectError::not_found(relationship.describe()));
        }
        self.rebuild(&shape)
    }

    fn drop_table(&mut self, name: &str) -> Result<(), ObjectError> {
        self.require_table(name)?;
        self.conn
            .execute_batch(&format!("DROP TABLE {};", quote(name)))
            .map_err(engine(name))
    }

    fn create_table(&mut self, entity: &EntityDefinition) -> Result<(), ObjectError> {
        let name = entity.name.as_str();
        match introspect::object_type(&self.conn, name).map_err(engine(name))? {
            Some(kind) if kind == "table" => return Err(ObjectError::already_exists(name)),
            Some(kind) => {
                return Err(ObjectError::new(
                    ObjectErrorKind::Conflict,
                    name,
                    format!("name {name} is taken by a {kind}"),
                ));
            }
            None => {}
        }
        self.conn
            .execute_batch(&TableShape::from_entity(entity).create_sql())
            .map_err(engine(name))
    }

    fn create_index(&mut self, index: &IndexDefinition) -> Result<(), ObjectError> {
        let name = index.name.as_str();
        if introspect::object_type(&self.conn, name)
            .map_err(engine(name))?
            .is_some()
        {
            return Err(ObjectError::already_exists(name));
        }
        self.require_table(&index.entity)?;
        self.conn
            .execute_batch(&create_index_sql(index))
            .map_err(engine(name))
    }

    fn create_foreign_key(&mut self, fk: &ForeignKeyDefinition) -> Result<(), ObjectError> {
        let mut shape = self.shape(&fk.child_entity)?;
        self.require_table(&fk.parent_entity)?;
        if !shape.add_foreign_key(ForeignKeyShape::from(fk)) {
            return Err(ObjectError::already_exists(&fk.name));
        }
        self.rebuild(&shape)
    }

    fn tables(&mut self) -> Result<Vec<TableMetadata>, ObjectError> {
        let names = introspect::user_tables(&self.conn).map_err(engine("sqlite_master"))?;
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let fields = introspect::column_names(&self.conn, &name).map_err(engine(&name))?;
            let indexes = introspect::explicit_indexes(&self.conn, &name).map_err(engine(&name))?;
            tables.push(TableMetadata {
                name,
                fields,
                indexes,
            });
        }
        Ok(tables)
    }

    fn close(self) -> Result<(), ObjectError> {
        let path = self.path.display().to_string();
        self.conn
            .close()
            .map_err(|(_, e)| ObjectError::engine(path, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vehicle_auth_core::FieldDefinition;

    fn entity(name: &str, key: &str, extra: &[&str]) -> EntityDefinition {
        let mut e = EntityDefinition::new(name, "").with_field(FieldDefinition::short_text(key, 50));
        for field in extra {
            e = e.with_field(FieldDefinition::short_text(field, 50));
        }
        e.with_primary_key(&[key])
    }

    fn open(dir: &TempDir) -> SqliteConnection {
        SqliteBackend::exclusive()
            .connect(&dir.path().join("test.db"))
            .unwrap()
    }

    #[test]
    fn test_create_table_twice_is_already_exists() {
        let dir = TempDir::new().unwrap();
        let mut conn = open(&dir);
        let address = entity("Address", "AddressID", &[]);
        conn.create_table(&address).unwrap();
        let err = conn.create_table(&address).unwrap_err();
        assert!(err.is_already_exists());
    }

    #[test]
    fn test_drop_missing_table_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut conn = open(&dir);
        assert!(conn.drop_table("Nothing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_drop_view_is_conflict() {
        let dir = TempDir::new().unwrap();
        let mut conn = open(&dir);
        conn.inner()
            .execute_batch("CREATE VIEW \"Documents\" AS SELECT 1 AS x;")
            .unwrap();
        let err = conn.drop_table("Documents").unwrap_err();
        assert_eq!(err.kind, ObjectErrorKind::Conflict);
    }

    #[test]
    fn test_index_checks() {
        let dir = TempDir::new().unwrap();
        let mut conn = open(&dir);
        let index = IndexDefinition::on("Contact", "AddressID");
        assert!(conn.create_index(&index).unwrap_err().is_not_found());

        conn.create_table(&entity("Contact", "ContactID", &["AddressID"]))
            .unwrap();
        conn.create_index(&index).unwrap();
        assert!(conn.create_index(&index).unwrap_err().is_already_exists());
    }

    #[test]
    fn test_foreign_key_add_and_drop_preserves_rows_and_indexes() {
        let dir = TempDir::new().unwrap();
        let mut conn = open(&dir);
        conn.create_table(&entity("Address", "AddressID", &[])).unwrap();
        conn.create_table(&entity("Contact", "ContactID", &["AddressID"]))
            .unwrap();
        conn.create_index(&IndexDefinition::on("Contact", "AddressID"))
            .unwrap();
        conn.inner()
            .execute_batch(
                "INSERT INTO \"Address\" VALUES ('a1');
                 INSERT INTO \"Contact\" VALUES ('c1', 'a1');",
            )
            .unwrap();

        let fk = ForeignKeyDefinition::new("FK_Contact_Address", "Contact", "AddressID", "Address", "AddressID");
        conn.create_foreign_key(&fk).unwrap();
        assert!(conn.create_foreign_key(&fk).unwrap_err().is_already_exists());

        let rels = conn.relationships().unwrap();
        assert_eq!(rels.len(), 1);
        assert!(rels[0].matches(&fk));

        // Enforcement is back on after the rebuild.
        assert!(
            conn.inner()
                .execute_batch("INSERT INTO \"Contact\" VALUES ('c2', 'missing');")
                .is_err()
        );

        conn.drop_relationship(&rels[0]).unwrap();
        assert!(conn.relationships().unwrap().is_empty());
        assert!(conn.drop_relationship(&rels[0]).unwrap_err().is_not_found());

        let tables = conn.tables().unwrap();
        let contact = tables.iter().find(|t| t.name == "Contact").unwrap();
        assert_eq!(contact.indexes, vec!["idx_Contact_AddressID"]);
        let rows: i64 = conn
            .inner()
            .query_row("SELECT COUNT(*) FROM \"Contact\"", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_foreign_key_to_missing_parent() {
        let dir = TempDir::new().unwrap();
        let mut conn = open(&dir);
        conn.create_table(&entity("Contact", "ContactID", &["AddressID"]))
            .unwrap();
        let fk = ForeignKeyDefinition::new("FK_Contact_Address", "Contact", "AddressID", "Address", "AddressID");
        let err = conn.create_foreign_key(&fk).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.object, "Address");
    }

    #[test]
    fn test_read_only_requires_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.db");
        let err = SqliteBackend::read_only().connect(&path).err().unwrap();
        assert_eq!(err, ConnectionError::NotFound(path.clone()));
        assert!(!path.exists());
    }

    #[test]
    fn test_close_releases_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let conn = SqliteBackend::exclusive().connect(&path).unwrap();
        conn.close().unwrap();
        let again = SqliteBackend::exclusive()
            .with_busy_timeout(Duration::ZERO)
            .connect(&path);
        assert!(again.is_ok());
    }
}
