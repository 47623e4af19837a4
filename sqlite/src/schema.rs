//! SQL generation for catalog entities.
//!
//! Tables are described by a [`TableShape`] that can be built either from an
//! [`EntityDefinition`] or from what SQLite reports about an existing table.
//! Both paths render through the same [`TableShape::create_sql`], so a table
//! rebuilt to add or remove a foreign key has exactly the DDL a fresh
//! creation with the same foreign keys would have.
//!
//! # Type mapping
//!
//! | Field type      | SQLite column                       |
//! |-----------------|-------------------------------------|
//! | `ShortText(n)`  | `VARCHAR(n)`                        |
//! | `LongText`      | `TEXT`                              |
//! | `DateTime`      | `DATETIME`                          |
//! | `Boolean`       | `BOOLEAN`                           |
//! | `AutoIncrement` | `INTEGER PRIMARY KEY AUTOINCREMENT` |

use vehicle_auth_core::{EntityDefinition, FieldType, ForeignKeyDefinition, IndexDefinition};

/// Quotes an identifier for use in SQL.
pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn quote_list(idents: &[String]) -> String {
    idents.iter().map(|i| quote(i)).collect::<Vec<_>>().join(", ")
}

/// Declared SQLite type for a field type.
pub fn column_type(field_type: FieldType) -> String {
    match field_type {
        FieldType::ShortText(n) => format!("VARCHAR({n})"),
        FieldType::LongText => "TEXT".to_string(),
        FieldType::DateTime => "DATETIME".to_string(),
        FieldType::Boolean => "BOOLEAN".to_string(),
        FieldType::AutoIncrement => "INTEGER".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnShape {
    pub name: String,
    pub sql_type: String,
    pub not_null: bool,
    pub autoincrement: bool,
}

/// One `FOREIGN KEY` clause.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ForeignKeyShape {
    pub parent: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
}

impl From<&ForeignKeyDefinition> for ForeignKeyShape {
    fn from(fk: &ForeignKeyDefinition) -> Self {
        Self {
            parent: fk.parent_entity.clone(),
            from: fk.child_fields.clone(),
            to: fk.parent_fields.clone(),
        }
    }
}

/// Everything needed to (re)create a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableShape {
    pub name: String,
    pub columns: Vec<ColumnShape>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyShape>,
}

impl TableShape {
    /// Shape of a freshly created entity table (no foreign keys).
    pub fn from_entity(entity: &EntityDefinition) -> Self {
        let columns = entity
            .fields
            .iter()
            .map(|f| ColumnShape {
                name: f.name.clone(),
                sql_type: column_type(f.field_type),
                not_null: !f.nullable || entity.is_key_field(&f.name),
                autoincrement: f.field_type.is_auto_increment(),
            })
            .collect();

        Self {
            name: entity.name.clone(),
            columns,
            primary_key: entity.primary_key.clone(),
            foreign_keys: Vec::new(),
        }
    }

    // AUTOINCREMENT is only legal on a sole INTEGER PRIMARY KEY column.
    fn inline_key(&self) -> Option<&str> {
        match self.primary_key.as_slice() {
            [key] => self
                .columns
                .iter()
                .find(|c| &c.name == key && c.autoincrement)
                .map(|c| c.name.as_str()),
            _ => None,
        }
    }

    /// Adds a foreign key, keeping clauses in canonical order.
    ///
    /// Returns `false` if an identical clause is already present.
    pub fn add_foreign_key(&mut self, fk: ForeignKeyShape) -> bool {
        if self.foreign_keys.contains(&fk) {
            return false;
        }
        self.foreign_keys.push(fk);
        self.foreign_keys.sort();
        true
    }

    /// Removes a foreign key. Returns `false` if it was not present.
    pub fn remove_foreign_key(&mut self, fk: &ForeignKeyShape) -> bool {
        let before = self.foreign_keys.len();
        self.foreign_keys.retain(|f| f != fk);
        self.foreign_keys.len() != before
    }

    /// `CREATE TABLE` statement for this shape.
    pub fn create_sql(&self) -> String {
        self.create_sql_as(&self.name)
    }

    /// `CREATE TABLE` statement for this shape under another name.
    pub fn create_sql_as(&self, table: &str) -> String {
        let inline_key = self.inline_key();
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if Some(c.name.as_str()) == inline_key {
                    format!("    {} INTEGER PRIMARY KEY AUTOINCREMENT", quote(&c.name))
                } else if c.not_null {
                    format!("    {} {} NOT NULL", quote(&c.name), c.sql_type)
                } else {
                    format!("    {} {}", quote(&c.name), c.sql_type)
                }
            })
            .collect();

        if inline_key.is_none() && !self.primary_key.is_empty() {
            lines.push(format!("    PRIMARY KEY ({})", quote_list(&self.primary_key)));
        }
        for fk in &self.foreign_keys {
            lines.push(format!(
                "    FOREIGN KEY ({}) REFERENCES {} ({})",
                quote_list(&fk.from),
                quote(&fk.parent),
                quote_list(&fk.to)
            ));
        }

        format!("CREATE TABLE {} (\n{}\n)", quote(table), lines.join(",\n"))
    }
}

/// `CREATE INDEX` statement for a single-field index.
pub fn create_index_sql(index: &IndexDefinition) -> String {
    format!(
        "CREATE INDEX {} ON {} ({})",
        quote(&index.name),
        quote(&index.entity),
        quote(&index.field)
    )
}
