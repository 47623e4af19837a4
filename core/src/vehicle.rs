//! The vehicle authorization catalog.
//!
//! Normalizes the nested JSON authorization documents into 19 tables:
//!
//! - independent: `Addresses`, `ContactDetails`, `Documents`
//! - first tier: `ContactPersons`, `BillingInformation`, `Bodies`
//! - central: `Applications`
//! - second tier: `Issues`, `ApplicationBodies`, `VehicleTypes`, `ApplicationStaff`
//! - third tier: `VehiclesToAuthorise`, `ApplicableRules`, `MemberStateMappings`,
//!   `AgencyMappings`
//! - fourth tier: `Networks`, `AgencyMappingValues`, `MSMappingRequirements`,
//!   `MSMappingRequirementValues`

use crate::{
    CatalogError, EntityDefinition, FieldDefinition as F, ForeignKeyDefinition as Fk,
    IndexDefinition as Ix, SchemaCatalog,
};

/// Name of the central entity.
pub const CENTRAL_ENTITY: &str = "Applications";

/// Creation priority used to break ties between independent entities.
pub const CREATION_PRIORITY: [&str; 19] = [
    "Addresses",
    "ContactDetails",
    "Documents",
    "ContactPersons",
    "BillingInformation",
    "Bodies",
    "Applications",
    "Issues",
    "ApplicationBodies",
    "VehicleTypes",
    "ApplicationStaff",
    "VehiclesToAuthorise",
    "ApplicableRules",
    "MemberStateMappings",
    "AgencyMappings",
    "Networks",
    "AgencyMappingValues",
    "MSMappingRequirements",
    "MSMappingRequirementValues",
];

// JSON identifiers are opaque strings.
const ID_LEN: u16 = 50;

fn id(name: &str) -> F {
    F::short_text(name, ID_LEN)
}

/// Builds the vehicle authorization catalog.
///
/// # Errors
///
/// Returns a [`CatalogError`] only if the definitions below are edited into
/// an inconsistent state.
///
/// # Examples
///
/// ```
/// use vehicle_auth_core::vehicle_authorization_catalog;
///
/// let catalog = vehicle_authorization_catalog().unwrap();
/// assert_eq!(catalog.list_entities().len(), 19);
/// assert_eq!(catalog.central_entity(), Some("Applications"));
/// ```
pub fn vehicle_authorization_catalog() -> Result<SchemaCatalog, CatalogError> {
    let mut builder = SchemaCatalog::builder()
        .priority(&CREATION_PRIORITY)
        .central_entity(CENTRAL_ENTITY);

    for entity in entities() {
        builder = builder.entity(entity);
    }
    for index in indexes() {
        builder = builder.index(index);
    }
    for fk in foreign_keys() {
        builder = builder.foreign_key(fk);
    }

    builder.build()
}

fn entities() -> Vec<EntityDefinition> {
    vec![
        EntityDefinition::new("Addresses", "Postal addresses shared by persons, bodies and billing")
            .with_fields([
                id("AddressID"),
                F::short_text("Street", 255),
                F::short_text("City", 100),
                F::short_text("PostalCode", 20),
                F::short_text("CountryCode", 10),
            ])
            .with_primary_key(&["AddressID"]),
        EntityDefinition::new("ContactDetails", "Phone, fax, e-mail and website records")
            .with_fields([
                id("ContactDetailsID"),
                F::short_text("Phone", 50),
                F::short_text("Fax", 50),
                F::short_text("Email", 255),
                F::short_text("Website", 255),
            ])
            .with_primary_key(&["ContactDetailsID"]),
        EntityDefinition::new("Documents", "Attached documents referenced by mapping values")
            .with_fields([
                id("DocumentID"),
                F::short_text("FileTitle", 255),
                F::long_text("FilePath"),
            ])
            .with_primary_key(&["DocumentID"]),
        EntityDefinition::new("ContactPersons", "Applicant and financial contact persons")
            .with_fields([
                id("ContactPersonID"),
                F::short_text("FirstName", 100),
                F::short_text("Surname", 100),
                F::short_text("TitleOrFunction", 255),
                id("AddressID"),
                id("ContactDetailsID"),
                F::short_text("LanguagesSpoken", 255),
                F::short_text("PersonType", 50),
            ])
            .with_primary_key(&["ContactPersonID"]),
        EntityDefinition::new("BillingInformation", "Invoicing entity of an application")
            .with_fields([
                id("BillingID"),
                F::short_text("LegalDenomination", 255),
                F::short_text("Acronym", 50),
                F::short_text("VATNumber", 50),
                F::short_text("NationalRegNumber", 100),
                id("AddressID"),
                id("ContactDetailsID"),
                F::long_text("SpecificBillingRequirements"),
            ])
            .with_primary_key(&["BillingID"]),
        EntityDefinition::new("Bodies", "Applicant, assessment and notified bodies")
            .with_fields([
                id("BodyID"),
                F::short_text("BodyType", 50),
                F::short_text("LegalDenomination", 255),
                F::short_text("Acronym", 50),
                F::short_text("VATNumber", 50),
                F::short_text("NationalRegNumber", 100),
                id("AddressID"),
                id("ContactDetailsID"),
                F::long_text("AdditionalInfo"),
                F::short_text("BodyName", 255),
                F::short_text("BodyIdNumber", 50),
                F::short_text("EINNumber", 50),
            ])
            .with_primary_key(&["BodyID"]),
        EntityDefinition::new("Applications", "Vehicle authorisation applications (central entity)")
            .with_fields([
                id("ApplicationID"),
                id("ID"),
                F::short_text("CaseType", 50),
                F::short_text("NationalRegNumber", 100),
                F::short_text("ProjectName", 255),
                F::short_text("ApplicationType", 100),
                F::short_text("ApplicationTypeVariantVersion", 100),
                F::short_text("IssuingAuthority", 255),
                F::short_text("ApplicationStatus", 50),
                F::short_text("Phase", 50),
                F::short_text("EIN", 50),
                F::short_text("LegalDenomination", 255),
                F::short_text("VehicleIdentifier", 255),
                F::short_text("MemberStates", 255),
                F::short_text("Subcategory", 100),
                id("PreEngagementID"),
                F::long_text("PreEngagementOtherInformation"),
                F::short_text("DocLang", 10),
                F::short_text("ApplicationVersion", 20),
                id("ContactPersonID"),
                id("FinancialContactPersonID"),
                id("BillingInformationID"),
                id("ApplicantBodyID"),
                F::datetime("CreatedDate"),
                F::datetime("LastModifiedDate"),
                F::boolean("IsArchived"),
            ])
            .with_primary_key(&["ApplicationID"]),
        EntityDefinition::new("Issues", "Assessment issues raised on an application")
            .with_fields([
                id("IssueID"),
                id("ID"),
                id("ApplicationID").required(),
                F::short_text("Title", 255),
                F::long_text("IssueDescription"),
                F::short_text("Owner", 100),
                F::short_text("OwnerDisplayName", 255),
                F::long_text("Assignees"),
                F::long_text("AssigneesDisplayNames"),
                F::short_text("IssueType", 50),
                F::short_text("IssueStatus", 50),
                F::short_text("Resolution", 100),
                F::short_text("AssessmentStage", 100),
                F::long_text("ResolutionText"),
                F::long_text("ResolutionDescription"),
                F::datetime("CreatedDate"),
            ])
            .with_primary_key(&["IssueID"]),
        EntityDefinition::new("ApplicationBodies", "Bodies involved in an application, by role")
            .with_fields([
                id("ApplicationID"),
                id("BodyID"),
                F::short_text("BodyRole", 50),
            ])
            .with_primary_key(&["ApplicationID", "BodyID", "BodyRole"]),
        EntityDefinition::new("VehicleTypes", "Vehicle types and variants covered by an application")
            .with_fields([
                id("VehicleTypeID"),
                id("ApplicationID").required(),
                F::short_text("AuthorizationType", 100),
                F::short_text("VehicleType", 100),
                id("TypeID"),
                F::short_text("TypeName", 255),
                F::short_text("AltTypeName", 255),
                F::long_text("ReferenceToExistingStr"),
                F::long_text("DescriptionNew"),
                F::short_text("VehicleIdentifier", 255),
                F::short_text("VehicleValue", 255),
                id("AuthorizationHolderID"),
                F::short_text("VehicleMainCategory", 100),
                F::short_text("VehicleSubCategory", 100),
                F::long_text("NonCodedRestrictions"),
                F::long_text("CodedRestrictions"),
                F::long_text("ChangeSummary"),
                F::long_text("RegistrationEntityRecipients"),
            ])
            .with_primary_key(&["VehicleTypeID"]),
        EntityDefinition::new("ApplicationStaff", "Agency staff assigned to an application")
            .with_fields([
                F::auto_increment("StaffID"),
                id("ApplicationID").required(),
                F::short_text("StaffType", 50),
                F::short_text("StaffName", 255),
            ])
            .with_primary_key(&["StaffID"]),
        EntityDefinition::new("VehiclesToAuthorise", "Individual vehicles listed under a vehicle type")
            .with_fields([
                id("VehicleToAuthoriseID"),
                id("VehicleTypeID").required(),
                F::short_text("VehicleValue", 255),
                F::short_text("VehicleIdentifier", 255),
            ])
            .with_primary_key(&["VehicleToAuthoriseID"]),
        EntityDefinition::new("ApplicableRules", "Rules applicable to a vehicle type")
            .with_fields([
                id("RuleID"),
                id("VehicleTypeID").required(),
                F::short_text("RuleType", 50),
                F::short_text("MSCode", 10),
                F::long_text("Comment"),
                F::short_text("Directive", 255),
            ])
            .with_primary_key(&["RuleID"]),
        EntityDefinition::new("MemberStateMappings", "Per member state area of use of a vehicle type")
            .with_fields([
                id("MappingID"),
                id("VehicleTypeID").required(),
                F::short_text("CountryCode", 10),
                F::short_text("Name", 255),
                F::short_text("ShuntingOnlyTxt", 255),
                F::long_text("OtherDescription"),
                F::short_text("AssigneeStr", 255),
            ])
            .with_primary_key(&["MappingID"]),
        EntityDefinition::new("AgencyMappings", "Agency requirements checked for a vehicle type")
            .with_fields([
                id("AgencyMappingID"),
                id("VehicleTypeID").required(),
                F::short_text("Requirement", 255),
                F::long_text("RequirementDescr"),
            ])
            .with_primary_key(&["AgencyMappingID"]),
        EntityDefinition::new("Networks", "Networks covered by a member state mapping")
            .with_fields([id("MappingID"), F::short_text("NetworkName", 255)])
            .with_primary_key(&["MappingID", "NetworkName"]),
        EntityDefinition::new("AgencyMappingValues", "Evidence values attached to agency requirements")
            .with_fields([
                id("ValueID"),
                id("AgencyMappingID").required(),
                id("DocumentID"),
                F::long_text("ValueDescription"),
                F::long_text("ValueText"),
            ])
            .with_primary_key(&["ValueID"]),
        EntityDefinition::new("MSMappingRequirements", "National requirements of a member state mapping")
            .with_fields([
                id("RequirementID"),
                id("MappingID").required(),
                F::short_text("Requirement", 255),
                F::long_text("RequirementDescr"),
            ])
            .with_primary_key(&["RequirementID"]),
        EntityDefinition::new(
            "MSMappingRequirementValues",
            "Evidence values attached to national requirements",
        )
        .with_fields([
            id("ValueID"),
            id("RequirementID").required(),
            id("DocumentID"),
            F::long_text("ValueDescription"),
            F::long_text("ValueText"),
        ])
        .with_primary_key(&["ValueID"]),
    ]
}

fn indexes() -> Vec<Ix> {
    vec![
        Ix::on("ContactPersons", "AddressID"),
        Ix::on("ContactPersons", "ContactDetailsID"),
        Ix::on("BillingInformation", "AddressID"),
        Ix::on("Bodies", "AddressID"),
        Ix::on("Bodies", "BodyType"),
        Ix::on("Applications", "ApplicationStatus"),
        Ix::on("Applications", "ApplicationType"),
        Ix::on("Applications", "ContactPersonID"),
        Ix::on("Applications", "ApplicantBodyID"),
        Ix::on("Applications", "NationalRegNumber"),
        Ix::on("Issues", "ApplicationID"),
        Ix::on("Issues", "IssueStatus"),
        Ix::on("ApplicationStaff", "ApplicationID"),
        Ix::on("VehicleTypes", "ApplicationID"),
        Ix::on("VehicleTypes", "TypeID"),
        Ix::on("VehiclesToAuthorise", "VehicleTypeID"),
        Ix::on("ApplicableRules", "VehicleTypeID"),
        Ix::on("MemberStateMappings", "VehicleTypeID"),
        Ix::on("MemberStateMappings", "CountryCode"),
        Ix::on("AgencyMappings", "VehicleTypeID"),
        Ix::on("AgencyMappingValues", "AgencyMappingID"),
        Ix::on("AgencyMappingValues", "DocumentID"),
        Ix::on("MSMappingRequirements", "MappingID"),
        Ix::on("MSMappingRequirementValues", "RequirementID"),
        Ix::on("MSMappingRequirementValues", "DocumentID"),
    ]
}

fn foreign_keys() -> Vec<Fk> {
    vec![
        Fk::new("FK_ContactPersons_Addresses", "ContactPersons", "AddressID", "Addresses", "AddressID"),
        Fk::new(
            "FK_ContactPersons_ContactDetails",
            "ContactPersons",
            "ContactDetailsID",
            "ContactDetails",
            "ContactDetailsID",
        ),
        Fk::new("FK_BillingInformation_Addresses", "BillingInformation", "AddressID", "Addresses", "AddressID"),
        Fk::new(
            "FK_BillingInformation_ContactDetails",
            "BillingInformation",
            "ContactDetailsID",
            "ContactDetails",
            "ContactDetailsID",
        ),
        Fk::new("FK_Bodies_Addresses", "Bodies", "AddressID", "Addresses", "AddressID"),
        Fk::new("FK_Bodies_ContactDetails", "Bodies", "ContactDetailsID", "ContactDetails", "ContactDetailsID"),
        Fk::new("FK_Applications_ContactPersons", "Applications", "ContactPersonID", "ContactPersons", "ContactPersonID"),
        Fk::new(
            "FK_Applications_FinancialContactPersons",
            "Applications",
            "FinancialContactPersonID",
            "ContactPersons",
            "ContactPersonID",
        ),
        Fk::new(
            "FK_Applications_BillingInformation",
            "Applications",
            "BillingInformationID",
            "BillingInformation",
            "BillingID",
        ),
        Fk::new("FK_Applications_Bodies", "Applications", "ApplicantBodyID", "Bodies", "BodyID"),
        Fk::new("FK_Issues_Applications", "Issues", "ApplicationID", "Applications", "ApplicationID"),
        Fk::new(
            "FK_ApplicationBodies_Applications",
            "ApplicationBodies",
            "ApplicationID",
            "Applications",
            "ApplicationID",
        ),
        Fk::new("FK_ApplicationBodies_Bodies", "ApplicationBodies", "BodyID", "Bodies", "BodyID"),
        Fk::new("FK_VehicleTypes_Applications", "VehicleTypes", "ApplicationID", "Applications", "ApplicationID"),
        Fk::new("FK_VehicleTypes_AuthorizationHolder", "VehicleTypes", "AuthorizationHolderID", "Bodies", "BodyID")
            .documented("Authorisation holders are frequently registered bodies absent from the submission"),
        Fk::new(
            "FK_ApplicationStaff_Applications",
            "ApplicationStaff",
            "ApplicationID",
            "Applications",
            "ApplicationID",
        ),
        Fk::new(
            "FK_VehiclesToAuthorise_VehicleTypes",
            "VehiclesToAuthorise",
            "VehicleTypeID",
            "VehicleTypes",
            "VehicleTypeID",
        ),
        Fk::new("FK_ApplicableRules_VehicleTypes", "ApplicableRules", "VehicleTypeID", "VehicleTypes", "VehicleTypeID"),
        Fk::new(
            "FK_MemberStateMappings_VehicleTypes",
            "MemberStateMappings",
            "VehicleTypeID",
            "VehicleTypes",
            "VehicleTypeID",
        ),
        Fk::new("FK_AgencyMappings_VehicleTypes", "AgencyMappings", "VehicleTypeID", "VehicleTypes", "VehicleTypeID"),
        Fk::new("FK_Networks_MemberStateMappings", "Networks", "MappingID", "MemberStateMappings", "MappingID"),
        Fk::new(
            "FK_AgencyMappingValues_AgencyMappings",
            "AgencyMappingValues",
            "AgencyMappingID",
            "AgencyMappings",
            "AgencyMappingID",
        ),
        Fk::new("FK_AgencyMappingValues_Documents", "AgencyMappingValues", "DocumentID", "Documents", "DocumentID"),
        Fk::new(
            "FK_MSMappingRequirements_MemberStateMappings",
            "MSMappingRequirements",
            "MappingID",
            "MemberStateMappings",
            "MappingID",
        ),
        Fk::new(
            "FK_MSMappingRequirementValues_MSMappingRequirements",
            "MSMappingRequirementValues",
            "RequirementID",
            "MSMappingRequirements",
            "RequirementID",
        ),
        Fk::new(
            "FK_MSMappingRequirementValues_Documents",
            "MSMappingRequirementValues",
            "DocumentID",
            "Documents",
            "DocumentID",
        ),
    ]
}
