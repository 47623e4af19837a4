//! Schema object definitions for the relational catalog.
//!
//! This module defines the data model used to describe the tables, indexes
//! and foreign keys of the vehicle authorization database. The types carry no
//! behavior beyond construction helpers; they are assembled into an
//! immutable [`SchemaCatalog`](crate::SchemaCatalog) and handed by reference
//! to the orderer, executor and verifier.

use serde::{Deserialize, Serialize};

/// Semantic type of a field.
///
/// Backends map each variant to their own column type (for SQLite:
/// `VARCHAR(n)`, `TEXT`, `DATETIME`, `BOOLEAN`, `INTEGER`).
///
/// # Examples
///
/// ```
/// use vehicle_auth_core::FieldType;
///
/// let ft = FieldType::ShortText(50);
/// assert!(matches!(ft, FieldType::ShortText(50)));
/// assert!(FieldType::AutoIncrement.is_auto_increment());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Bounded text with a maximum length in characters.
    ShortText(u16),
    /// Unbounded text (memo).
    LongText,
    /// Date and time value.
    DateTime,
    /// Yes/no value.
    Boolean,
    /// Engine-generated integer key.
    AutoIncrement,
}

impl FieldType {
    /// Returns `true` for [`FieldType::AutoIncrement`].
    pub fn is_auto_increment(&self) -> bool {
        matches!(self, FieldType::AutoIncrement)
    }
}

/// A single column of an entity.
///
/// Fields are nullable unless marked [`required`](FieldDefinition::required).
/// Primary-key fields are always stored as NOT NULL regardless of this flag.
///
/// # Examples
///
/// ```
/// use vehicle_auth_core::{FieldDefinition, FieldType};
///
/// let street = FieldDefinition::short_text("Street", 255);
/// assert!(street.nullable);
///
/// let id = FieldDefinition::short_text("AddressID", 50).required();
/// assert!(!id.nullable);
/// assert_eq!(id.field_type, FieldType::ShortText(50));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
}

impl FieldDefinition {
    /// Creates a nullable field of the given type.
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            nullable: true,
        }
    }

    pub fn short_text(name: &str, length: u16) -> Self {
        Self::new(name, FieldType::ShortText(length))
    }

    pub fn long_text(name: &str) -> Self {
        Self::new(name, FieldType::LongText)
    }

    pub fn datetime(name: &str) -> Self {
        Self::new(name, FieldType::DateTime)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    /// Creates an engine-generated integer field. Auto-increment fields are
    /// never nullable.
    pub fn auto_increment(name: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: FieldType::AutoIncrement,
            nullable: false,
        }
    }

    /// Marks the field as NOT NULL.
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A database table as modeled by the catalog.
///
/// The `description` is documentation for reports and is never sent to the
/// database engine.
///
/// # Examples
///
/// ```
/// use vehicle_auth_core::{EntityDefinition, FieldDefinition};
///
/// let entity = EntityDefinition::new("Addresses", "Postal addresses")
///     .with_field(FieldDefinition::short_text("AddressID", 50))
///     .with_field(FieldDefinition::short_text("City", 100))
///     .with_primary_key(&["AddressID"]);
///
/// assert_eq!(entity.fields.len(), 2);
/// assert!(entity.is_key_field("AddressID"));
/// assert!(entity.field("City").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldDefinition>,
    pub primary_key: Vec<String>,
}

impl EntityDefinition {
    /// Creates an entity with no fields and no primary key.
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            fields: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    /// Appends a field.
    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Appends several fields in order.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDefinition>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Sets the (possibly composite) primary key.
    pub fn with_primary_key(mut self, fields: &[&str]) -> Self {
        self.primary_key = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns `true` if `name` is part of the primary key.
    pub fn is_key_field(&self, name: &str) -> bool {
        self.primary_key.iter().any(|k| k == name)
    }
}

/// Whether a foreign key is materialized in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ForeignKeyMode {
    /// Created as a relationship in the database (the default).
    #[default]
    Enforced,
    /// Kept in the catalog for ordering and documentation only.
    Documented,
}

/// A directed dependency from a child entity's fields to a parent's key.
///
/// # Examples
///
/// ```
/// use vehicle_auth_core::{ForeignKeyDefinition, ForeignKeyMode};
///
/// let fk = ForeignKeyDefinition::new(
///     "FK_ContactPersons_Addresses",
///     "ContactPersons",
///     "AddressID",
///     "Addresses",
///     "AddressID",
/// );
/// assert_eq!(fk.mode, ForeignKeyMode::Enforced);
/// assert!(fk.is_enforced());
///
/// let documented = fk.clone().documented("Parent may live outside the submission");
/// assert!(!documented.is_enforced());
/// assert!(documented.note.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    pub name: String,
    pub child_entity: String,
    pub child_fields: Vec<String>,
    pub parent_entity: String,
    pub parent_fields: Vec<String>,
    pub mode: ForeignKeyMode,
    pub note: Option<String>,
}

impl ForeignKeyDefinition {
    /// Creates an enforced single-column foreign key.
    pub fn new(
        name: &str,
        child_entity: &str,
        child_field: &str,
        parent_entity: &str,
        parent_field: &str,
    ) -> Self {
        Self::composite(
            name,
            child_entity,
            &[child_field],
            parent_entity,
            &[parent_field],
        )
    }

    /// Creates an enforced multi-column foreign key.
    pub fn composite(
        name: &str,
        child_entity: &str,
        child_fields: &[&str],
        parent_entity: &str,
        parent_fields: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            child_entity: child_entity.to_string(),
            child_fields: child_fields.iter().map(|f| f.to_string()).collect(),
            parent_entity: parent_entity.to_string(),
            parent_fields: parent_fields.iter().map(|f| f.to_string()).collect(),
            mode: ForeignKeyMode::Enforced,
            note: None,
        }
    }

    /// Turns this key into a documented-only relationship.
    pub fn documented(mut self, note: &str) -> Self {
        self.mode = ForeignKeyMode::Documented;
        self.note = Some(note.to_string());
        self
    }

    pub fn is_enforced(&self) -> bool {
        self.mode == ForeignKeyMode::Enforced
    }

    /// Human-readable form, e.g. `Issues(ApplicationID) -> Applications(ApplicationID)`.
    pub fn describe(&self) -> String {
        format!(
            "{}({}) -> {}({})",
            self.child_entity,
            self.child_fields.join(", "),
            self.parent_entity,
            self.parent_fields.join(", ")
        )
    }
}

/// A single-field secondary index.
///
/// # Examples
///
/// ```
/// use vehicle_auth_core::IndexDefinition;
///
/// let idx = IndexDefinition::on("Issues", "ApplicationID");
/// assert_eq!(idx.name, "idx_Issues_ApplicationID");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub entity: String,
    pub field: String,
}

impl IndexDefinition {
    pub fn new(name: &str, entity: &str, field: &str) -> Self {
        Self {
            name: name.to_string(),
            entity: entity.to_string(),
            field: field.to_string(),
        }
    }

    /// Creates an index named `idx_<entity>_<field>`.
    pub fn on(entity: &str, field: &str) -> Self {
        Self::new(&format!("idx_{entity}_{field}"), entity, field)
    }
}
