//! EMR rows projected from FHIR resources

use chrono::{NaiveDate, NaiveTime};

use crate::error::FhirError;
use crate::resources::{DiagnosticReport, Encounter, Patient};

const UNKNOWN_NAME: &str = "Unknown";
const DEFAULT_REASON: &str = "General visit";
const IMPORTED_DIAGNOSIS: &str = "Imported from FHIR";
const IMPORTED_TREATMENT: &str = "See notes for details";
const DEFAULT_NOTES: &str = "No notes available";

/// Values allowed by the `Patients.Gender` check constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Map a FHIR administrative gender, case-insensitively.
    /// `unknown`, unrecognised codes and a missing value all become `Other`.
    pub fn from_fhir(code: Option<&str>) -> Self {
        match code.map(str::to_ascii_lowercase).as_deref() {
            Some("male") => Gender::Male,
            Some("female") => Gender::Female,
            _ => Gender::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

/// Values allowed by the `Appointments.Status` check constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Map a FHIR encounter status. Anything that is not `finished` or
    /// `cancelled` is still an upcoming appointment.
    pub fn from_fhir(status: Option<&str>) -> Self {
        match status {
            Some("finished") => AppointmentStatus::Completed,
            Some("cancelled") => AppointmentStatus::Cancelled,
            // planned, arrived, triaged, in-progress and unknown codes
            _ => AppointmentStatus::Scheduled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }
}

/// Row for the `Patients` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: String,
    pub fhir_id: Option<String>,
}

impl NewPatient {
    pub fn from_fhir(patient: &Patient) -> Result<Self, FhirError> {
        let name = patient.name.first();
        let first_name = name
            .and_then(|n| n.given.first())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_NAME.to_string());
        let last_name = name
            .and_then(|n| n.family.clone())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string());

        let birth_date = patient
            .birth_date
            .as_deref()
            .ok_or_else(|| FhirError::invalid_resource("Patient", "missing birthDate"))
            .and_then(|d| parse_date("Patient", "birthDate", d))?;

        // Patients without an email get a synthesized one, which is also the
        // key an Encounter reference is matched against.
        let email = patient
            .telecom_value("email")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.{}@example.com", first_name, last_name));

        Ok(Self {
            birth_date,
            gender: Gender::from_fhir(patient.gender.as_deref()),
            address: patient
                .address
                .first()
                .and_then(|a| a.line.first())
                .cloned(),
            phone: patient.telecom_value("phone").map(str::to_string),
            email,
            fhir_id: patient.id.clone(),
            first_name,
            last_name,
        })
    }
}

/// Row for the `Appointments` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub patient_id: i32,
    pub doctor_id: i32,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: String,
    pub status: AppointmentStatus,
}

impl NewAppointment {
    pub fn from_encounter(
        encounter: &Encounter,
        patient_id: i32,
        doctor_id: i32,
    ) -> Result<Self, FhirError> {
        let start = encounter
            .period
            .as_ref()
            .and_then(|p| p.start.as_deref())
            .ok_or_else(|| FhirError::invalid_resource("Encounter", "missing period.start"))?;

        let (date, time) = start.split_once('T').ok_or_else(|| {
            FhirError::invalid_resource(
                "Encounter",
                format!("period.start '{}' has no time component", start),
            )
        })?;

        Ok(Self {
            patient_id,
            doctor_id,
            date: parse_date("Encounter", "period.start", date)?,
            time: parse_time("Encounter", "period.start", strip_zone(time))?,
            reason: encounter
                .types
                .first()
                .and_then(|t| t.text.clone())
                .unwrap_or_else(|| DEFAULT_REASON.to_string()),
            status: AppointmentStatus::from_fhir(encounter.status.as_deref()),
        })
    }
}

/// Row for the `MedicalRecords` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMedicalRecord {
    pub patient_id: i32,
    pub doctor_id: i32,
    pub visit_date: NaiveDate,
    pub diagnosis: String,
    pub treatment: String,
    pub notes: String,
}

impl NewMedicalRecord {
    /// Only the free-text form is carried over; coded conclusions are not mapped.
    pub fn from_diagnostic_report(
        report: &DiagnosticReport,
        patient_id: i32,
        doctor_id: i32,
    ) -> Result<Self, FhirError> {
        let effective = report.effective_date_time.as_deref().ok_or_else(|| {
            FhirError::invalid_resource("DiagnosticReport", "missing effectiveDateTime")
        })?;
        let date = effective.split('T').next().unwrap_or(effective);

        Ok(Self {
            patient_id,
            doctor_id,
            visit_date: parse_date("DiagnosticReport", "effectiveDateTime", date)?,
            diagnosis: IMPORTED_DIAGNOSIS.to_string(),
            treatment: IMPORTED_TREATMENT.to_string(),
            notes: report
                .presented_form
                .first()
                .and_then(|f| f.data.clone())
                .unwrap_or_else(|| DEFAULT_NOTES.to_string()),
        })
    }
}

/// Drop a trailing timezone designator (`Z`, `+hh:mm`, `-hh:mm`)
fn strip_zone(time: &str) -> &str {
    time.find(['Z', '+', '-']).map_or(time, |i| &time[..i])
}

fn parse_date(
    resource_type: &'static str,
    element: &str,
    value: &str,
) -> Result<NaiveDate, FhirError> {
    value.parse().map_err(|e| {
        FhirError::invalid_resource(
            resource_type,
            format!("{} '{}' is not a full date: {}", element, value, e),
        )
    })
}

fn parse_time(
    resource_type: &'static str,
    element: &str,
    value: &str,
) -> Result<NaiveTime, FhirError> {
    value.parse().map_err(|e| {
        FhirError::invalid_resource(
            resource_type,
            format!("{} '{}' is not a valid time: {}", element, value, e),
        )
    })
}
