//! The immutable schema catalog.
//!
//! A [`SchemaCatalog`] is built once at process start through
//! [`SchemaCatalogBuilder`] and then only read. The builder validates the
//! definitions so every consumer can rely on names resolving.

use serde::Serialize;

use crate::validate::{CatalogError, validate_catalog};
use crate::{EntityDefinition, ForeignKeyDefinition, IndexDefinition};

/// Complete static set of entity, index and foreign-key definitions.
///
/// # Examples
///
/// ```
/// use vehicle_auth_core::*;
///
/// let catalog = SchemaCatalog::builder()
///     .entity(
///         EntityDefinition::new("Address", "Postal address")
///             .with_field(FieldDefinition::short_text("AddressID", 50))
///             .with_primary_key(&["AddressID"]),
///     )
///     .entity(
///         EntityDefinition::new("Contact", "Contact person")
///             .with_field(FieldDefinition::short_text("ContactID", 50))
///             .with_field(FieldDefinition::short_text("AddressID", 50))
///             .with_primary_key(&["ContactID"]),
///     )
///     .foreign_key(ForeignKeyDefinition::new(
///         "FK_Contact_Address", "Contact", "AddressID", "Address", "AddressID",
///     ))
///     .build()
///     .unwrap();
///
/// assert_eq!(catalog.list_entities().len(), 2);
/// assert_eq!(catalog.enforced_foreign_keys().count(), 1);
/// assert_eq!(catalog.priority(), ["Address", "Contact"]);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct SchemaCatalog {
    entities: Vec<EntityDefinition>,
    indexes: Vec<IndexDefinition>,
    foreign_keys: Vec<ForeignKeyDefinition>,
    priority: Vec<String>,
    central_entity: Option<String>,
}

impl SchemaCatalog {
    pub fn builder() -> SchemaCatalogBuilder {
        SchemaCatalogBuilder::default()
    }

    pub fn list_entities(&self) -> &[EntityDefinition] {
        &self.entities
    }

    pub fn list_indexes(&self) -> &[IndexDefinition] {
        &self.indexes
    }

    pub fn list_foreign_keys(&self) -> &[ForeignKeyDefinition] {
        &self.foreign_keys
    }

    /// Foreign keys that are materialized in the database, in catalog order.
    pub fn enforced_foreign_keys(&self) -> impl Iterator<Item = &ForeignKeyDefinition> {
        self.foreign_keys.iter().filter(|fk| fk.is_enforced())
    }

    /// Looks up an entity by name.
    pub fn entity(&self, name: &str) -> Option<&EntityDefinition> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Explicit tie-break priority for the dependency orderer.
    ///
    /// Defaults to entity declaration order when the builder was not given
    /// an explicit list.
    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    /// The entity the verifier reports on specifically, if designated.
    pub fn central_entity(&self) -> Option<&str> {
        self.central_entity.as_deref()
    }

    /// Indexes declared on `entity`.
    pub fn indexes_for<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a IndexDefinition> {
        self.indexes.iter().filter(move |i| i.entity == entity)
    }
}

/// Builder for [`SchemaCatalog`].
#[derive(Debug, Default)]
pub struct SchemaCatalogBuilder {
    entities: Vec<EntityDefinition>,
    indexes: Vec<IndexDefinition>,
    foreign_keys: Vec<ForeignKeyDefinition>,
    priority: Option<Vec<String>>,
    central_entity: Option<String>,
}

impl SchemaCatalogBuilder {
    pub fn entity(mut self, entity: EntityDefinition) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn foreign_key(mut self, fk: ForeignKeyDefinition) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Sets the tie-break priority list used by the dependency orderer.
    pub fn priority(mut self, names: &[&str]) -> Self {
        self.priority = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn central_entity(mut self, name: &str) -> Self {
        self.central_entity = Some(name.to_string());
        self
    }

    /// Validates and freezes the catalog.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] reported by
    /// [`validate_catalog`].
    pub fn build(self) -> Result<SchemaCatalog, CatalogError> {
        let catalog = self.build_unchecked();
        match validate_catalog(&catalog).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(catalog),
        }
    }

    /// Freezes the catalog without validating it.
    ///
    /// Intended for validation tests and for callers that run
    /// [`validate_catalog`] themselves.
    pub fn build_unchecked(self) -> SchemaCatalog {
        let priority = self
            .priority
            .unwrap_or_else(|| self.entities.iter().map(|e| e.name.clone()).collect());
        SchemaCatalog {
            entities: self.entities,
            indexes: self.indexes,
            foreign_keys: self.foreign_keys,
            priority,
            central_entity: self.central_entity,
        }
    }
}
