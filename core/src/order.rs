//! Dependency ordering of catalog entities.
//!
//! Entities are scheduled with Kahn's algorithm over the foreign-key graph
//! (child depends on parent). When several entities are ready at once the
//! catalog's explicit priority list decides, so the resulting order never
//! depends on hash iteration or traversal details.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::SchemaCatalog;

/// The foreign-key graph contains a cycle.
///
/// Lists every entity that could not be scheduled, sorted by name. This is a
/// catalog defect and is raised before any database object is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("foreign-key cycle detected among entities: {}", entities.join(", "))]
pub struct SchemaCycleError {
    pub entities: Vec<String>,
}

/// Computes the entity creation order for `catalog`.
///
/// Every entity referenced by a foreign key precedes the entity declaring
/// it. Both enforced and documented foreign keys participate; a foreign key
/// from an entity to itself is ignored for ordering.
///
/// # Errors
///
/// Returns [`SchemaCycleError`] if the foreign keys form a cycle.
///
/// # Examples
///
/// ```
/// use vehicle_auth_core::*;
///
/// let catalog = SchemaCatalog::builder()
///     .entity(
///         EntityDefinition::new("Contact", "")
///             .with_field(FieldDefinition::short_text("ContactID", 50))
///             .with_field(FieldDefinition::short_text("AddressID", 50))
///             .with_primary_key(&["ContactID"]),
///     )
///     .entity(
///         EntityDefinition::new("Address", "")
///             .with_field(FieldDefinition::short_text("AddressID", 50))
///             .with_primary_key(&["AddressID"]),
///     )
///     .foreign_key(ForeignKeyDefinition::new(
///         "FK_Contact_Address", "Contact", "AddressID", "Address", "AddressID",
///     ))
///     .build()
///     .unwrap();
///
/// assert_eq!(creation_order(&catalog).unwrap(), vec!["Address", "Contact"]);
/// ```
pub fn creation_order(catalog: &SchemaCatalog) -> Result<Vec<String>, SchemaCycleError> {
    let entities = catalog.list_entities();
    let rank = priority_ranks(catalog);

    let mut pending: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for entity in entities {
        pending.insert(entity.name.as_str(), 0);
        dependents.insert(entity.name.as_str(), Vec::new());
    }

    // Parallel foreign keys between the same pair count once.
    let mut edges = BTreeSet::new();
    for fk in catalog.list_foreign_keys() {
        if fk.child_entity == fk.parent_entity {
            continue;
        }
        edges.insert((fk.parent_entity.as_str(), fk.child_entity.as_str()));
    }
    for (parent, child) in edges {
        if let (Some(list), Some(count)) = (dependents.get_mut(parent), pending.get_mut(child)) {
            list.push(child);
            *count += 1;
        }
    }

    let mut ready: BTreeSet<(usize, &str)> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| (rank_of(&rank, name), *name))
        .collect();

    let mut order = Vec::with_capacity(entities.len());
    while let Some(next) = ready.pop_first() {
        let (_, name) = next;
        order.push(name.to_string());
        if let Some(children) = dependents.get(name) {
            for child in children {
                if let Some(count) = pending.get_mut(child) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert((rank_of(&rank, child), *child));
                    }
                }
            }
        }
    }

    if order.len() != pending.len() {
        let mut stuck: Vec<String> = pending
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(name, _)| name.to_string())
            .collect();
        stuck.sort();
        return Err(SchemaCycleError { entities: stuck });
    }

    Ok(order)
}

fn priority_ranks(catalog: &SchemaCatalog) -> HashMap<&str, usize> {
    catalog
        .priority()
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect()
}

// Unlisted entities rank after every listed one; the name breaks the tie.
fn rank_of(rank: &HashMap<&str, usize>, name: &str) -> usize {
    rank.get(name).copied().unwrap_or(usize::MAX)
}
