//! Metadata lookups against `sqlite_master` and the schema pragmas.

use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension, Result};

use crate::schema::{ColumnShape, ForeignKeyShape, TableShape};

/// Type of the schema object called `name` (`table`, `index`, `view`,
/// `trigger`), if any. SQLite object names are case-insensitive.
pub(crate) fn object_type(conn: &Connection, name: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT type FROM sqlite_master WHERE name = ?1 COLLATE NOCASE",
        [name],
        |row| row.get(0),
    )
    .optional()
}

/// User tables, excluding engine-internal `sqlite_*` objects.
pub(crate) fn user_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
         ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

/// Column names of `table` in declaration order.
pub(crate) fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let rows = stmt.query_map([table], |row| row.get(0))?;
    rows.collect()
}

/// Explicitly created indexes on `table` (key and unique auto-indexes excluded).
pub(crate) fn explicit_indexes(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT name FROM pragma_index_list(?1) WHERE origin = 'c' ORDER BY name")?;
    let rows = stmt.query_map([table], |row| row.get(0))?;
    rows.collect()
}

/// Stored `CREATE INDEX` statements for `table`.
pub(crate) fn index_sql(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT sql FROM sqlite_master \
         WHERE type = 'index' AND tbl_name = ?1 AND sql IS NOT NULL \
         ORDER BY name",
    )?;
    let rows = stmt.query_map([table], |row| row.get(0))?;
    rows.collect()
}

/// Foreign-key clauses declared on `table`, grouped by constraint.
pub(crate) fn foreign_keys(conn: &Connection, table: &str) -> Result<Vec<ForeignKeyShape>> {
    let mut stmt = conn.prepare(
        "SELECT id, \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
    )?;
    let rows = stmt.query_map([table], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;

    let mut grouped: BTreeMap<i64, ForeignKeyShape> = BTreeMap::new();
    for row in rows {
        let (id, parent, from, to) = row?;
        let fk = grouped.entry(id).or_insert_with(|| ForeignKeyShape {
            parent,
            from: Vec::new(),
            to: Vec::new(),
        });
        fk.from.push(from);
        fk.to.push(to.unwrap_or_default());
    }

    let mut list: Vec<ForeignKeyShape> = grouped.into_values().collect();
    list.sort();
    Ok(list)
}

/// Reads back the shape of an existing table, or `None` if there is none.
pub(crate) fn table_shape(conn: &Connection, table: &str) -> Result<Option<TableShape>> {
    let sql: Option<String> = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    let Some(sql) = sql else {
        return Ok(None);
    };
    let autoincrement = sql.to_ascii_uppercase().contains("AUTOINCREMENT");

    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    let rows = stmt.query_map([table], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, bool>(2)?,
            row.get::<_, i64>(3)?,
        ))
    })?;

    let mut columns = Vec::new();
    let mut keyed: Vec<(i64, String)> = Vec::new();
    for row in rows {
        let (name, sql_type, not_null, pk) = row?;
        if pk > 0 {
            keyed.push((pk, name.clone()));
        }
        columns.push(ColumnShape {
            name,
            sql_type,
            not_null,
            autoincrement: false,
        });
    }
    keyed.sort();
    let primary_key: Vec<String> = keyed.into_iter().map(|(_, name)| name).collect();

    if autoincrement {
        if let [key] = primary_key.as_slice() {
            for column in &mut columns {
                if &column.name == key && column.sql_type.eq_ignore_ascii_case("INTEGER") {
                    column.autoincrement = true;
                    column.not_null = true;
                }
            }
        }
    }

    Ok(Some(TableShape {
        name: table.to_string(),
        columns,
        primary_key,
        foreign_keys: foreign_keys(conn, table)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vehicle_auth_core::{EntityDefinition, FieldDefinition};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE \"Parent\" (\"ID\" VARCHAR(50) NOT NULL, PRIMARY KEY (\"ID\"));
             CREATE TABLE \"Child\" (
                 \"ChildID\" INTEGER PRIMARY KEY AUTOINCREMENT,
                 \"ParentID\" VARCHAR(50),
                 FOREIGN KEY (\"ParentID\") REFERENCES \"Parent\" (\"ID\")
             );
             CREATE INDEX \"idx_Child_ParentID\" ON \"Child\" (\"ParentID\");
             CREATE VIEW \"ChildView\" AS SELECT * FROM \"Child\";",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_object_type() {
        let conn = conn();
        assert_eq!(object_type(&conn, "Parent").unwrap().as_deref(), Some("table"));
        assert_eq!(object_type(&conn, "parent").unwrap().as_deref(), Some("table"));
        assert_eq!(object_type(&conn, "ChildView").unwrap().as_deref(), Some("view"));
        assert_eq!(
            object_type(&conn, "idx_Child_ParentID").unwrap().as_deref(),
            Some("index")
        );
        assert_eq!(object_type(&conn, "Missing").unwrap(), None);
    }

    #[test]
    fn test_user_tables_exclude_internal() {
        let conn = conn();
        // AUTOINCREMENT creates sqlite_sequence.
        assert_eq!(object_type(&conn, "sqlite_sequence").unwrap().as_deref(), Some("table"));
        assert_eq!(user_tables(&conn).unwrap(), vec!["Child", "Parent"]);
    }

    #[test]
    fn test_explicit_indexes_skip_key_indexes() {
        let conn = conn();
        assert_eq!(explicit_indexes(&conn, "Child").unwrap(), vec!["idx_Child_ParentID"]);
        // "Parent" has a text primary key backed by an automatic index.
        assert!(explicit_indexes(&conn, "Parent").unwrap().is_empty());
    }

    #[test]
    fn test_foreign_keys_read_back() {
        let conn = conn();
        let fks = foreign_keys(&conn, "Child").unwrap();
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].parent, "Parent");
        assert_eq!(fks[0].from, vec!["ParentID"]);
        assert_eq!(fks[0].to, vec!["ID"]);
    }

    #[test]
    fn test_table_shape_round_trips_entity() {
        let conn = Connection::open_in_memory().unwrap();
        let entity = EntityDefinition::new("Staff", "")
            .with_field(FieldDefinition::auto_increment("StaffID"))
            .with_field(FieldDefinition::short_text("ApplicationID", 50).required())
            .with_field(FieldDefinition::long_text("Notes"))
            .with_primary_key(&["StaffID"]);
        let created = TableShape::from_entity(&entity);
        conn.execute_batch(&created.create_sql()).unwrap();

        let read = table_shape(&conn, "Staff").unwrap().unwrap();
        assert_eq!(read, created);
        assert_eq!(read.create_sql(), created.create_sql());
        assert!(table_shape(&conn, "Missing").unwrap().is_none());
    }
}
