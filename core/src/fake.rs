//! In-memory backend for unit tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::connection::{
    ConnectionError, ObjectError, ObjectErrorKind, RelationshipInfo, SchemaBackend,
    SchemaConnection, TableMetadata,
};
use crate::{
    EntityDefinition, FieldDefinition, ForeignKeyDefinition, IndexDefinition, SchemaCatalog,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeState {
    pub tables: BTreeMap<String, Vec<String>>,
    /// index name -> table name
    pub indexes: BTreeMap<String, String>,
    pub relationships: Vec<RelationshipInfo>,
    pub connects: usize,
    pub closed: bool,
}

#[derive(Debug, Default)]
struct Behavior {
    locked: bool,
    failing_tables: BTreeSet<String>,
    persistent_indexes: BTreeSet<String>,
    relationship_drop_failure: Option<ObjectErrorKind>,
    read_failure: bool,
}

#[derive(Debug, Default, Clone)]
pub struct FakeBackend {
    state: Rc<RefCell<FakeState>>,
    behavior: Rc<RefCell<Behavior>>,
}

impl FakeBackend {
    pub fn locked() -> Self {
        let backend = Self::default();
        backend.behavior.borrow_mut().locked = true;
        backend
    }

    pub fn failing_table(self, name: &str) -> Self {
        self.behavior
            .borrow_mut()
            .failing_tables
            .insert(name.to_string());
        self
    }

    /// Pre-creates an index that survives table drops.
    pub fn persistent_index(self, name: &str) -> Self {
        self.behavior
            .borrow_mut()
            .persistent_indexes
            .insert(name.to_string());
        self.state
            .borrow_mut()
            .indexes
            .insert(name.to_string(), String::new());
        self
    }

    pub fn fail_relationship_drops(&self, kind: ObjectErrorKind) {
        self.behavior.borrow_mut().relationship_drop_failure = Some(kind);
    }

    pub fn fail_reads(&self) {
        self.behavior.borrow_mut().read_failure = true;
    }

    pub fn state(&self) -> FakeState {
        self.state.borrow().clone()
    }

    pub fn with_state(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.borrow_mut());
    }
}

pub struct FakeConnection {
    state: Rc<RefCell<FakeState>>,
    behavior: Rc<RefCell<Behavior>>,
}

impl SchemaBackend for FakeBackend {
    type Connection = FakeConnection;

    fn connect(&self, database: &Path) -> Result<FakeConnection, ConnectionError> {
        if self.behavior.borrow().locked {
            return Err(ConnectionError::Locked(PathBuf::from(database)));
        }
        let mut state = self.state.borrow_mut();
        state.connects += 1;
        state.closed = false;
        Ok(FakeConnection {
            state: Rc::clone(&self.state),
            behavior: Rc::clone(&self.behavior),
        })
    }
}

impl SchemaConnection for FakeConnection {
    fn relationships(&mut self) -> Result<Vec<RelationshipInfo>, ObjectError> {
        if self.behavior.borrow().read_failure {
            return Err(ObjectError::engine("relationships", "disk I/O error"));
        }
        Ok(self.state.borrow().relationships.clone())
    }

    fn drop_relationship(&mut self, relationship: &RelationshipInfo) -> Result<(), ObjectError> {
        if let Some(kind) = self.behavior.borrow().relationship_drop_failure {
            return Err(ObjectError::new(kind, relationship.describe(), "refused"));
        }
        self.state
            .borrow_mut()
            .relationships
            .retain(|r| r != relationship);
        Ok(())
    }

    fn drop_table(&mut self, name: &str) -> Result<(), ObjectError> {
        let behavior = self.behavior.borrow();
        let mut state = self.state.borrow_mut();
        if state.tables.remove(name).is_none() {
            return Err(ObjectError::not_found(name));
        }
        state
            .indexes
            .retain(|index, table| table.as_str() != name || behavior.persistent_indexes.contains(index));
        state.relationships.retain(|r| r.child_table != name);
        Ok(())
    }

    fn create_table(&mut self, entity: &EntityDefinition) -> Result<(), ObjectError> {
        if self.behavior.borrow().failing_tables.contains(&entity.name) {
            return Err(ObjectError::engine(&entity.name, "table creation refused"));
        }
        let mut state = self.state.borrow_mut();
        if state.tables.contains_key(&entity.name) {
            return Err(ObjectError::already_exists(&entity.name));
        }
        let fields = entity.fields.iter().map(|f| f.name.clone()).collect();
        state.tables.insert(entity.name.clone(), fields);
        Ok(())
    }

    fn create_index(&mut self, index: &IndexDefinition) -> Result<(), ObjectError> {
        let mut state = self.state.borrow_mut();
        if state.indexes.contains_key(&index.name) {
            return Err(ObjectError::already_exists(&index.name));
        }
        if !state.tables.contains_key(&index.entity) {
            return Err(ObjectError::not_found(&index.entity));
        }
        state
            .indexes
            .insert(index.name.clone(), index.entity.clone());
        Ok(())
    }

    fn create_foreign_key(&mut self, fk: &ForeignKeyDefinition) -> Result<(), ObjectError> {
        let mut state = self.state.borrow_mut();
        for table in [&fk.child_entity, &fk.parent_entity] {
            if !state.tables.contains_key(table) {
                return Err(ObjectError::not_found(table.as_str()));
            }
        }
        if state.relationships.iter().any(|r| r.matches(fk)) {
            return Err(ObjectError::already_exists(&fk.name));
        }
        state.relationships.push(RelationshipInfo {
            child_table: fk.child_entity.clone(),
            child_fields: fk.child_fields.clone(),
            parent_table: fk.parent_entity.clone(),
            parent_fields: fk.parent_fields.clone(),
        });
        Ok(())
    }

    fn tables(&mut self) -> Result<Vec<TableMetadata>, ObjectError> {
        if self.behavior.borrow().read_failure {
            return Err(ObjectError::engine("tables", "disk I/O error"));
        }
        let state = self.state.borrow();
        Ok(state
            .tables
            .iter()
            .map(|(name, fields)| TableMetadata {
                name: name.clone(),
                fields: fields.clone(),
                indexes: state
                    .indexes
                    .iter()
                    .filter(|(_, table)| *table == name)
                    .map(|(index, _)| index.clone())
                    .collect(),
            })
            .collect())
    }

    fn close(self) -> Result<(), ObjectError> {
        self.state.borrow_mut().closed = true;
        Ok(())
    }
}

/// `Contact` references `Address`; declared child-first.
pub fn two_entity_catalog() -> SchemaCatalog {
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
        .expect("valid two-entity catalog")
}
