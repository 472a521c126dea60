//! FHIR bundle import
//!
//! `import_bundle` is the single-bundle entry point; `import_file` and
//! `import_directory` wrap it for bundles stored on disk.

mod batch;
mod importer;
mod store;

pub use batch::{FileImportError, FileOutcome, ImportSummary, import_directory, import_file};
pub use importer::{ImportCause, ImportError, ImportOptions, ImportStats, import_bundle};
pub use store::{Store, StoreError, StoreTransaction};
