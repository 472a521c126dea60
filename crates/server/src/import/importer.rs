//! Transactional projection of a FHIR bundle onto the EMR tables

use std::collections::HashMap;

use emr_core::{
    Bundle, BundleEntry, DiagnosticReport, Encounter, FhirError, NewAppointment, NewMedicalRecord,
    NewPatient, Patient, PatientReference,
};
use serde::Serialize;
use thiserror::Error;

use super::store::{Store, StoreError, StoreTransaction};

/// Settings that apply to every imported row
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Doctor recorded on imported appointments and medical records.
    /// FHIR encounters carry no attribution this schema can use.
    pub default_doctor_id: i32,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            default_doctor_id: 1,
        }
    }
}

/// What one committed bundle changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub patients: usize,
    pub appointments: usize,
    pub medical_records: usize,
    /// Rows that already existed and were left untouched
    pub unchanged: usize,
    /// Entries dropped because their subject could not be resolved
    pub skipped: usize,
    /// Entries of resource types the importer does not map
    pub ignored: usize,
}

/// Why a bundle was not imported
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Malformed bundle: {0}")]
    MalformedInput(#[source] serde_json::Error),

    #[error("Invalid FHIR bundle format: {0}")]
    InvalidBundle(String),

    /// Raised after the transaction was opened; nothing from the bundle persists
    #[error("Failed to import FHIR bundle: {0}")]
    BundleImport(#[source] ImportCause),
}

/// Underlying cause of a rolled back import
#[derive(Debug, Error)]
pub enum ImportCause {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Resource(#[from] FhirError),
}

impl From<FhirError> for ImportError {
    fn from(err: FhirError) -> Self {
        match err {
            FhirError::MalformedInput(e) => ImportError::MalformedInput(e),
            FhirError::InvalidBundle(msg) => ImportError::InvalidBundle(msg),
            other => ImportError::BundleImport(ImportCause::Resource(other)),
        }
    }
}

/// Import one bundle inside a single transaction.
///
/// Patients are written first, then Encounters, then DiagnosticReports, so
/// that subject references can resolve against patients from the same
/// bundle regardless of entry order. Any error rolls back the whole bundle.
#[tracing::instrument(skip_all, fields(bytes = text.len()))]
pub async fn import_bundle<S: Store>(
    store: &S,
    text: &str,
    options: &ImportOptions,
) -> Result<ImportStats, ImportError> {
    let bundle = Bundle::parse(text).inspect_err(|e| {
        tracing::warn!(error = %e, "Rejected FHIR bundle");
        metrics::counter!("fhir_bundle_imports_total", "outcome" => "rejected").increment(1);
    })?;

    let mut tx = store
        .begin()
        .await
        .map_err(|e| ImportError::BundleImport(e.into()))?;

    let mut importer = Importer {
        tx: &mut tx,
        doctor_id: options.default_doctor_id,
        bundle_patients: HashMap::new(),
        stats: ImportStats::default(),
    };

    match importer.run(&bundle).await {
        Ok(stats) => {
            tx.commit()
                .await
                .map_err(|e| ImportError::BundleImport(e.into()))?;
            metrics::counter!("fhir_bundle_imports_total", "outcome" => "committed").increment(1);
            tracing::info!(
                patients = stats.patients,
                appointments = stats.appointments,
                medical_records = stats.medical_records,
                unchanged = stats.unchanged,
                skipped = stats.skipped,
                "FHIR bundle imported"
            );
            Ok(stats)
        }
        Err(cause) => {
            if let Err(e) = tx.rollback().await {
                tracing::error!(error = %e, "Rollback failed");
            }
            metrics::counter!("fhir_bundle_imports_total", "outcome" => "rolled_back").increment(1);
            tracing::warn!(error = %cause, "FHIR bundle rolled back");
            Err(ImportError::BundleImport(cause))
        }
    }
}

struct Importer<'a, T> {
    tx: &'a mut T,
    doctor_id: i32,
    /// `Patient/{id}` and entry `fullUrl` of every Patient in this bundle,
    /// mapped to the row it was stored as or matched by email
    bundle_patients: HashMap<String, i32>,
    stats: ImportStats,
}

impl<T: StoreTransaction> Importer<'_, T> {
    async fn run(&mut self, bundle: &Bundle) -> Result<ImportStats, ImportCause> {
        let groups = bundle.partition();
        self.stats.ignored = groups.ignored;

        for entry in groups.patients {
            self.import_patient(entry).await?;
        }
        for entry in groups.encounters {
            self.import_encounter(entry).await?;
        }
        for entry in groups.diagnostic_reports {
            self.import_diagnostic_report(entry).await?;
        }

        Ok(std::mem::take(&mut self.stats))
    }

    async fn import_patient(&mut self, entry: &BundleEntry) -> Result<(), ImportCause> {
        let patient = Patient::from_json(&entry.resource)?;
        let row = NewPatient::from_fhir(&patient)?;

        let patient_id = match self.tx.insert_patient(&row).await? {
            Some(patient_id) => {
                self.stats.patients += 1;
                Some(patient_id)
            }
            None => {
                tracing::debug!(email = %row.email, "Patient already present");
                self.stats.unchanged += 1;
                self.tx.find_patient_by_email(&row.email).await?
            }
        };

        if let Some(patient_id) = patient_id {
            let keys = patient
                .id
                .iter()
                .map(|id| format!("Patient/{}", id))
                .chain(entry.full_url.iter().cloned());
            for key in keys {
                self.bundle_patients.insert(key, patient_id);
            }
        }
        Ok(())
    }

    async fn import_encounter(&mut self, entry: &BundleEntry) -> Result<(), ImportCause> {
        let encounter = Encounter::from_json(&entry.resource)?;
        let Some(patient_id) = self
            .subject_patient("Encounter", encounter.subject_reference())
            .await?
        else {
            return Ok(());
        };

        let row = NewAppointment::from_encounter(&encounter, patient_id, self.doctor_id)?;
        if self.tx.insert_appointment(&row).await? {
            self.stats.appointments += 1;
        } else {
            self.stats.unchanged += 1;
        }
        Ok(())
    }

    async fn import_diagnostic_report(&mut self, entry: &BundleEntry) -> Result<(), ImportCause> {
        let report = DiagnosticReport::from_json(&entry.resource)?;
        let Some(patient_id) = self
            .subject_patient("DiagnosticReport", report.subject_reference())
            .await?
        else {
            return Ok(());
        };

        let row = NewMedicalRecord::from_diagnostic_report(&report, patient_id, self.doctor_id)?;
        if self.tx.insert_medical_record(&row).await? {
            self.stats.medical_records += 1;
        } else {
            self.stats.unchanged += 1;
        }
        Ok(())
    }

    /// Resolve a subject reference, counting the entry as skipped when it
    /// has no reference or the reference matches no stored patient.
    async fn subject_patient(
        &mut self,
        resource_type: &'static str,
        reference: Option<&str>,
    ) -> Result<Option<i32>, StoreError> {
        let resolved = match reference {
            Some(reference) => self.resolve_patient(reference).await?,
            None => None,
        };

        if resolved.is_none() {
            tracing::debug!(resource_type, reference, "Skipping entry with unresolved subject");
            metrics::counter!("fhir_entries_skipped_total", "resource_type" => resource_type)
                .increment(1);
            self.stats.skipped += 1;
        }
        Ok(resolved)
    }

    /// Match the reference against the Patients of this bundle first, then
    /// treat its id as a patient email.
    ///
    /// FHIR ids are only trusted within one bundle; across bundles the same
    /// id may name different people.
    async fn resolve_patient(&mut self, reference: &str) -> Result<Option<i32>, StoreError> {
        if let Some(&patient_id) = self.bundle_patients.get(reference) {
            return Ok(Some(patient_id));
        }

        let Some(reference) = PatientReference::parse(reference) else {
            return Ok(None);
        };
        let local = format!("Patient/{}", reference.id());
        if let Some(&patient_id) = self.bundle_patients.get(&local) {
            return Ok(Some(patient_id));
        }
        self.tx.find_patient_by_email(reference.id()).await
    }
}
