//! Catalog, ordering and lifecycle logic for the vehicle authorization schema.
//!
//! This crate is database-agnostic:
//!
//! - [`SchemaCatalog`]: the immutable set of entities, indexes and foreign
//!   keys, with [`vehicle_authorization_catalog`] providing the 19-table
//!   vehicle authorization model.
//! - [`creation_order`]: dependency ordering of entities.
//! - [`SchemaExecutor`]: drops and recreates the schema through a
//!   [`SchemaBackend`], producing an [`ExecutionReport`].
//! - [`Verifier`]: reconciles a live database with the catalog.
//!
//! Concrete engines implement [`SchemaBackend`] and [`SchemaConnection`]
//! (see the `vehicle-auth-sqlite` crate).
//!
//! # Example
//!
//! ```
//! use vehicle_auth_core::*;
//!
//! let catalog = vehicle_authorization_catalog().unwrap();
//! let order = creation_order(&catalog).unwrap();
//!
//! assert_eq!(order.first().map(String::as_str), Some("Addresses"));
//! assert!(validate_catalog(&catalog).is_empty());
//! ```

mod catalog;
mod connection;
mod error;
mod executor;
mod order;
mod types;
mod validate;
mod vehicle;
mod verify;

#[cfg(test)]
mod fake;

pub use catalog::{SchemaCatalog, SchemaCatalogBuilder};
pub use connection::{
    ConnectionError, ObjectError, ObjectErrorKind, RelationshipInfo, SchemaBackend,
    SchemaConnection, TableMetadata,
};
pub use error::{Result, SchemaError};
pub use executor::{EntityOutcome, ExecutionReport, IssueKind, SchemaExecutor, SchemaIssue};
pub use order::{SchemaCycleError, creation_order};
pub use types::*;
pub use validate::{CatalogError, is_valid_identifier, validate_catalog};
pub use vehicle::{CENTRAL_ENTITY, CREATION_PRIORITY, vehicle_authorization_catalog};
pub use verify::{CentralEntityStatus, VerificationReport, Verifier};
