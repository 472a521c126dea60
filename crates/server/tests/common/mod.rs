//! Shared helpers for the integration tests: an in-memory transactional
//! store and builders for FHIR bundle JSON.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use emr_core::{NewAppointment, NewMedicalRecord, NewPatient};
use emr_server::import::{Store, StoreError, StoreTransaction};
use serde_json::{Value as JsonValue, json};

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct StoredPatient {
    pub id: i32,
    pub row: NewPatient,
}

/// Committed contents of the fake database
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub patients: Vec<StoredPatient>,
    pub appointments: Vec<NewAppointment>,
    pub medical_records: Vec<NewMedicalRecord>,
}

impl Tables {
    pub fn patient_by_email(&self, email: &str) -> Option<&StoredPatient> {
        self.patients.iter().find(|p| p.row.email == email)
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    pub begun: usize,
    pub committed: usize,
    pub rolled_back: usize,
}

/// Store whose transactions work on a snapshot that replaces the committed
/// tables on commit and is thrown away on rollback or drop.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    counters: Arc<Mutex<Counters>>,
    failing_email: Option<String>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserting a patient with this email fails like a constraint violation
    pub fn failing_on_email(email: &str) -> Self {
        Self {
            failing_email: Some(email.to_string()),
            ..Self::default()
        }
    }

    /// Every connection attempt fails
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn tables(&self) -> Tables {
        self.tables.lock().unwrap().clone()
    }

    pub fn begun(&self) -> usize {
        self.counters.lock().unwrap().begun
    }

    pub fn committed(&self) -> usize {
        self.counters.lock().unwrap().committed
    }

    pub fn rolled_back(&self) -> usize {
        self.counters.lock().unwrap().rolled_back
    }
}

pub struct MemoryTransaction {
    staged: Tables,
    tables: Arc<Mutex<Tables>>,
    counters: Arc<Mutex<Counters>>,
    failing_email: Option<String>,
}

#[async_trait]
impl Store for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, StoreError> {
        if self.unavailable {
            return Err(StoreError::Backend("connection refused".to_string()));
        }
        self.counters.lock().unwrap().begun += 1;
        Ok(MemoryTransaction {
            staged: self.tables(),
            tables: Arc::clone(&self.tables),
            counters: Arc::clone(&self.counters),
            failing_email: self.failing_email.clone(),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Backend("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn insert_patient(&mut self, patient: &NewPatient) -> Result<Option<i32>, StoreError> {
        if self.failing_email.as_deref() == Some(patient.email.as_str()) {
            return Err(StoreError::Backend(format!(
                "value too long for patient {}",
                patient.email
            )));
        }

        if self.staged.patient_by_email(&patient.email).is_some() {
            return Ok(None);
        }

        let id = self.staged.patients.len() as i32 + 1;
        self.staged.patients.push(StoredPatient {
            id,
            row: patient.clone(),
        });
        Ok(Some(id))
    }

    async fn insert_appointment(
        &mut self,
        appointment: &NewAppointment,
    ) -> Result<bool, StoreError> {
        let conflict = self.staged.appointments.iter().any(|a| {
            a.patient_id == appointment.patient_id
                && a.date == appointment.date
                && a.time == appointment.time
        });
        if conflict {
            return Ok(false);
        }
        self.staged.appointments.push(appointment.clone());
        Ok(true)
    }

    async fn insert_medical_record(
        &mut self,
        record: &NewMedicalRecord,
    ) -> Result<bool, StoreError> {
        let conflict = self.staged.medical_records.iter().any(|r| {
            r.patient_id == record.patient_id
                && r.visit_date == record.visit_date
                && r.notes == record.notes
        });
        if conflict {
            return Ok(false);
        }
        self.staged.medical_records.push(record.clone());
        Ok(true)
    }

    async fn find_patient_by_email(&mut self, email: &str) -> Result<Option<i32>, StoreError> {
        Ok(self.staged.patient_by_email(email).map(|p| p.id))
    }

    async fn commit(self) -> Result<(), StoreError> {
        *self.tables.lock().unwrap() = self.staged;
        self.counters.lock().unwrap().committed += 1;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.counters.lock().unwrap().rolled_back += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FHIR fixtures
// ---------------------------------------------------------------------------

/// Patient with a declared email
pub fn patient(id: &str, given: &str, family: &str, email: &str) -> JsonValue {
    json!({
        "resourceType": "Patient",
        "id": id,
        "name": [{"use": "official", "family": family, "given": [given]}],
        "gender": "female",
        "birthDate": "1985-07-14",
        "address": [{"line": ["12 Elm Street"], "city": "Boston"}],
        "telecom": [
            {"system": "phone", "value": "555-0142"},
            {"system": "email", "value": email}
        ]
    })
}

pub fn encounter(reference: &str, start: &str, status: &str) -> JsonValue {
    json!({
        "resourceType": "Encounter",
        "status": status,
        "subject": {"reference": reference},
        "type": [{"text": "Wellness visit"}],
        "period": {"start": start, "end": start}
    })
}

pub fn diagnostic_report(reference: &str, effective: &str, notes: &str) -> JsonValue {
    json!({
        "resourceType": "DiagnosticReport",
        "status": "final",
        "subject": {"reference": reference},
        "effectiveDateTime": effective,
        "presentedForm": [{"contentType": "text/plain", "data": notes}]
    })
}

/// Entry that identifies its resource by `fullUrl`
pub fn full_url_entry(full_url: &str, resource: JsonValue) -> JsonValue {
    json!({"fullUrl": full_url, "resource": resource})
}

/// Serialize ready-made entries as a transaction bundle
pub fn transaction(entry: Vec<JsonValue>) -> String {
    json!({"resourceType": "Bundle", "type": "transaction", "entry": entry}).to_string()
}

/// Serialize resources as a collection bundle
pub fn bundle(resources: Vec<JsonValue>) -> String {
    let entry: Vec<JsonValue> = resources
        .into_iter()
        .map(|resource| json!({"resource": resource}))
        .collect();
    json!({"resourceType": "Bundle", "type": "collection", "entry": entry}).to_string()
}
