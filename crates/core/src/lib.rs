//! emr-core: FHIR input model and EMR row projections
//!
//! This crate holds the synchronous half of the FHIR importer: parsing a
//! Bundle, partitioning its entries, resolving reference strings and mapping
//! Patient, Encounter and DiagnosticReport resources onto the EMR schema.

pub mod bundle;
pub mod error;
pub mod outcome;
pub mod records;
pub mod reference;
pub mod resources;

pub use bundle::{Bundle, BundleEntry, Partitioned, ResourceKind};
pub use error::FhirError;
pub use outcome::{IssueSeverity, IssueType, OperationOutcome, OperationOutcomeIssue};
pub use records::{AppointmentStatus, Gender, NewAppointment, NewMedicalRecord, NewPatient};
pub use reference::PatientReference;
pub use resources::{DiagnosticReport, Encounter, Patient};
