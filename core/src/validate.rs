//! Catalog validation.
//!
//! Checks the structural invariants of a [`SchemaCatalog`] before any
//! component consumes it: identifiers are safe to embed in DDL, names are
//! unique, and every key, index and foreign key points at entities and
//! fields that exist. Dependency cycles are deliberately not checked here;
//! they are reported by [`creation_order`](crate::creation_order) as a
//! [`SchemaCycleError`](crate::SchemaCycleError).
//!
//! # Examples
//!
//! ```
//! use vehicle_auth_core::*;
//!
//! let catalog = SchemaCatalog::builder()
//!     .entity(
//!         EntityDefinition::new("Addresses", "")
//!             .with_field(FieldDefinition::short_text("AddressID", 50))
//!             .with_primary_key(&["AddressID"]),
//!     )
//!     .build()
//!     .unwrap();
//! assert!(validate_catalog(&catalog).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{EntityDefinition, SchemaCatalog};

/// Catalog validation errors.
///
/// A malformed catalog is a programming defect; these errors surface it at
/// construction time instead of during a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Name is empty or contains characters other than ASCII alphanumerics and `_`.
    #[error("invalid identifier '{0}': must contain only alphanumeric characters and underscores")]
    InvalidIdentifier(String),
    /// Two entities share a name.
    #[error("duplicate entity: {0}")]
    DuplicateEntity(String),
    /// Two fields of the same entity share a name.
    #[error("duplicate field {field} in entity {entity}")]
    DuplicateField { entity: String, field: String },
    /// An entity declares no fields.
    #[error("entity {0} has no fields")]
    EmptyEntity(String),
    /// An entity declares no primary key.
    #[error("entity {0} has no primary key")]
    MissingPrimaryKey(String),
    /// A definition references an entity that is not in the catalog.
    #[error("unknown entity '{entity}' referenced by {referenced_by}")]
    UnknownEntity {
        entity: String,
        referenced_by: String,
    },
    /// A definition references a field the entity does not declare.
    #[error("unknown field {entity}.{field} referenced by {referenced_by}")]
    UnknownField {
        entity: String,
        field: String,
        referenced_by: String,
    },
    /// Two indexes share a name.
    #[error("duplicate index: {0}")]
    DuplicateIndex(String),
    /// Two foreign keys share a name.
    #[error("duplicate foreign key: {0}")]
    DuplicateForeignKey(String),
    /// A foreign key has a different number of child and parent fields.
    #[error("foreign key {0} has mismatched child and parent field counts")]
    ForeignKeyArity(String),
    /// An auto-increment field is not the entity's only primary-key field.
    #[error("auto-increment field {entity}.{field} must be the sole primary key")]
    AutoIncrementNotSoleKey { entity: String, field: String },
}

/// Returns `true` if `name` can be used as a table, field or index name.
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_identifier(name: &str) -> Result<(), CatalogError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(CatalogError::InvalidIdentifier(name.to_string()))
    }
}

/// Validates a full catalog, returning every problem found.
///
/// An empty vector means the catalog is well formed.
///
/// # Examples
///
/// ```
/// use vehicle_auth_core::*;
///
/// let catalog = SchemaCatalog::builder()
///     .entity(
///         EntityDefinition::new("Contacts", "")
///             .with_field(FieldDefinition::short_text("ContactID", 50))
///             .with_primary_key(&["ContactID"]),
///     )
///     .foreign_key(ForeignKeyDefinition::new(
///         "FK_Contacts_Addresses", "Contacts", "ContactID", "Addresses", "AddressID",
///     ))
///     .build_unchecked();
///
/// let errors = validate_catalog(&catalog);
/// assert!(errors.iter().any(|e| matches!(e, CatalogError::UnknownEntity { .. })));
/// ```
pub fn validate_catalog(catalog: &SchemaCatalog) -> Vec<CatalogError> {
    let mut errors = Vec::new();

    let mut entity_names = HashSet::new();
    for entity in catalog.list_entities() {
        if !entity_names.insert(entity.name.as_str()) {
            errors.push(CatalogError::DuplicateEntity(entity.name.clone()));
            continue;
        }
        errors.extend(validate_entity(entity));
    }

    let mut index_names = HashSet::new();
    for index in catalog.list_indexes() {
        if let Err(e) = check_identifier(&index.name) {
            errors.push(e);
            continue;
        }
        if !index_names.insert(index.name.as_str()) {
            errors.push(CatalogError::DuplicateIndex(index.name.clone()));
            continue;
        }
        if let Err(e) = check_field_ref(catalog, &index.entity, &index.field, &index.name) {
            errors.push(e);
        }
    }

    let mut fk_names = HashSet::new();
    for fk in catalog.list_foreign_keys() {
        if !fk_names.insert(fk.name.as_str()) {
            errors.push(CatalogError::DuplicateForeignKey(fk.name.clone()));
            continue;
        }
        if fk.child_fields.is_empty() || fk.child_fields.len() != fk.parent_fields.len() {
            errors.push(CatalogError::ForeignKeyArity(fk.name.clone()));
            continue;
        }
        for field in &fk.child_fields {
            if let Err(e) = check_field_ref(catalog, &fk.child_entity, field, &fk.name) {
                errors.push(e);
            }
        }
        for field in &fk.parent_fields {
            if let Err(e) = check_field_ref(catalog, &fk.parent_entity, field, &fk.name) {
                errors.push(e);
            }
        }
    }

    for name in catalog.priority() {
        if catalog.entity(name).is_none() {
            errors.push(CatalogError::UnknownEntity {
                entity: name.clone(),
                referenced_by: "priority list".to_string(),
            });
        }
    }

    if let Some(central) = catalog.central_entity() {
        if catalog.entity(central).is_none() {
            errors.push(CatalogError::UnknownEntity {
                entity: central.to_string(),
                referenced_by: "central entity".to_string(),
            });
        }
    }

    dedup_preserving_order(errors)
}

fn validate_entity(entity: &EntityDefinition) -> Vec<CatalogError> {
    let mut errors = Vec::new();

    if let Err(e) = check_identifier(&entity.name) {
        errors.push(e);
        return errors;
    }
    if entity.fields.is_empty() {
        errors.push(CatalogError::EmptyEntity(entity.name.clone()));
        return errors;
    }

    let mut seen = HashSet::new();
    for field in &entity.fields {
        if let Err(e) = check_identifier(&field.name) {
            errors.push(e);
            continue;
        }
        if !seen.insert(field.name.as_str()) {
            errors.push(CatalogError::DuplicateField {
                entity: entity.name.clone(),
                field: field.name.clone(),
            });
        }
    }

    if entity.primary_key.is_empty() {
        errors.push(CatalogError::MissingPrimaryKey(entity.name.clone()));
    }
    for key in &entity.primary_key {
        if entity.field(key).is_none() {
            errors.push(CatalogError::UnknownField {
                entity: entity.name.clone(),
                field: key.clone(),
                referenced_by: "primary key".to_string(),
            });
        }
    }

    for field in entity.fields.iter().filter(|f| f.field_type.is_auto_increment()) {
        if entity.primary_key != [field.name.as_str()] {
            errors.push(CatalogError::AutoIncrementNotSoleKey {
                entity: entity.name.clone(),
                field: field.name.clone(),
            });
        }
    }

    errors
}

fn check_field_ref(
    catalog: &SchemaCatalog,
    entity: &str,
    field: &str,
    referenced_by: &str,
) -> Result<(), CatalogError> {
    let Some(def) = catalog.entity(entity) else {
        return Err(CatalogError::UnknownEntity {
            entity: entity.to_string(),
            referenced_by: referenced_by.to_string(),
        });
    };
    if def.field(field).is_none() {
        return Err(CatalogError::UnknownField {
            entity: entity.to_string(),
            field: field.to_string(),
            referenced_by: referenced_by.to_string(),
        });
    }
    Ok(())
}

// A foreign key with two unknown parent fields on a missing entity would
// otherwise report the same UnknownEntity twice.
fn dedup_preserving_order(errors: Vec<CatalogError>) -> Vec<CatalogError> {
    let mut out: Vec<CatalogError> = Vec::with_capacity(errors.len());
    for e in errors {
        if !out.contains(&e) {
            out.push(e);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldDefinition, ForeignKeyDefinition, IndexDefinition};

    fn addresses() -> EntityDefinition {
        EntityDefinition::new("Addresses", "")
            .with_field(FieldDefinition::short_text("AddressID", 50))
            .with_field(FieldDefinition::short_text("City", 100))
            .with_primary_key(&["AddressID"])
    }

    #[test]
    fn test_valid_identifier() {
        assert!(is_valid_identifier("Addresses"));
        assert!(is_valid_identifier("idx_Issues_ApplicationID"));
        assert!(is_valid_identifier("A_B_C123"));
    }

    #[test]
    fn test_invalid_identifier() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("drop;--"));
        assert!(!is_valid_identifier("Contact Persons"));
        assert!(!is_valid_identifier("vehicle-types"));
    }

    #[test]
    fn test_rejects_duplicate_entity() {
        let catalog = SchemaCatalog::builder()
            .entity(addresses())
            .entity(addresses())
            .build_unchecked();
        assert_eq!(
            validate_catalog(&catalog),
            vec![CatalogError::DuplicateEntity("Addresses".to_string())]
        );
    }

    #[test]
    fn test_rejects_unknown_primary_key_field() {
        let entity = EntityDefinition::new("Addresses", "")
            .with_field(FieldDefinition::short_text("AddressID", 50))
            .with_primary_key(&["Id"]);
        let catalog = SchemaCatalog::builder().entity(entity).build_unchecked();
        assert_eq!(
            validate_catalog(&catalog),
            vec![CatalogError::UnknownField {
                entity: "Addresses".to_string(),
                field: "Id".to_string(),
                referenced_by: "primary key".to_string(),
            }]
        );
    }

    #[test]
    fn test_rejects_entity_without_fields_or_key() {
        let catalog = SchemaCatalog::builder()
            .entity(EntityDefinition::new("Empty", ""))
            .entity(
                EntityDefinition::new("Keyless", "")
                    .with_field(FieldDefinition::long_text("Notes")),
            )
            .build_unchecked();
        let errors = validate_catalog(&catalog);
        assert!(errors.contains(&CatalogError::EmptyEntity("Empty".to_string())));
        assert!(errors.contains(&CatalogError::MissingPrimaryKey("Keyless".to_string())));
    }

    #[test]
    fn test_rejects_duplicate_field() {
        let entity = addresses().with_field(FieldDefinition::short_text("City", 10));
        let catalog = SchemaCatalog::builder().entity(entity).build_unchecked();
        assert_eq!(
            validate_catalog(&catalog),
            vec![CatalogError::DuplicateField {
                entity: "Addresses".to_string(),
                field: "City".to_string(),
            }]
        );
    }

    #[test]
    fn test_rejects_auto_increment_in_composite_key() {
        let entity = EntityDefinition::new("Staff", "")
            .with_field(FieldDefinition::auto_increment("StaffID"))
            .with_field(FieldDefinition::short_text("ApplicationID", 50))
            .with_primary_key(&["StaffID", "ApplicationID"]);
        let err = SchemaCatalog::builder().entity(entity).build().unwrap_err();
        assert_eq!(
            err,
            CatalogError::AutoIncrementNotSoleKey {
                entity: "Staff".to_string(),
                field: "StaffID".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_auto_increment_outside_key() {
        let entity = addresses().with_field(FieldDefinition::auto_increment("Sequence"));
        let catalog = SchemaCatalog::builder().entity(entity).build_unchecked();
        assert_eq!(
            validate_catalog(&catalog),
            vec![CatalogError::AutoIncrementNotSoleKey {
                entity: "Addresses".to_string(),
                field: "Sequence".to_string(),
            }]
        );
    }

    #[test]
    fn test_accepts_auto_increment_sole_key() {
        let entity = EntityDefinition::new("Staff", "")
            .with_field(FieldDefinition::auto_increment("StaffID"))
            .with_primary_key(&["StaffID"]);
        let catalog = SchemaCatalog::builder().entity(entity).build_unchecked();
        assert!(validate_catalog(&catalog).is_empty());
    }

    #[test]
    fn test_rejects_index_on_unknown_field() {
        let catalog = SchemaCatalog::builder()
            .entity(addresses())
            .index(IndexDefinition::on("Addresses", "Street"))
            .build_unchecked();
        let errors = validate_catalog(&catalog);
        assert!(matches!(
            errors.as_slice(),
            [CatalogError::UnknownField { field, .. }] if field == "Street"
        ));
    }

    #[test]
    fn test_rejects_foreign_key_arity_mismatch() {
        let fk = ForeignKeyDefinition::composite(
            "FK_bad",
            "Addresses",
            &["AddressID", "City"],
            "Addresses",
            &["AddressID"],
        );
        let catalog = SchemaCatalog::builder()
            .entity(addresses())
            .foreign_key(fk)
            .build_unchecked();
        assert_eq!(
            validate_catalog(&catalog),
            vec![CatalogError::ForeignKeyArity("FK_bad".to_string())]
        );
    }

    #[test]
    fn test_rejects_unknown_priority_and_central_entity() {
        let catalog = SchemaCatalog::builder()
            .entity(addresses())
            .priority(&["Addresses", "Bodies"])
            .central_entity("Applications")
            .build_unchecked();
        let errors = validate_catalog(&catalog);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_rejects_invalid_index_name() {
        let catalog = SchemaCatalog::builder()
            .entity(addresses())
            .index(IndexDefinition::new("idx bad", "Addresses", "City"))
            .build_unchecked();
        assert_eq!(
            validate_catalog(&catalog),
            vec![CatalogError::InvalidIdentifier("idx bad".to_string())]
        );
    }
}
