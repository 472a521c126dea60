use serde_json::Value as JsonValue;

use crate::error::FhirError;

/// Resource types the importer distinguishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Patient,
    Encounter,
    DiagnosticReport,
    Other(String),
}

impl ResourceKind {
    fn from_resource_type(resource_type: &str) -> Self {
        match resource_type {
            "Patient" => ResourceKind::Patient,
            "Encounter" => ResourceKind::Encounter,
            "DiagnosticReport" => ResourceKind::DiagnosticReport,
            other => ResourceKind::Other(other.to_string()),
        }
    }
}

/// A single bundle entry with its resource kept as raw JSON.
///
/// Resources are only deserialized into their typed shape once the importer
/// reaches them, so unrelated resource types never have to parse.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    pub full_url: Option<String>,
    pub kind: ResourceKind,
    pub resource: JsonValue,
}

impl BundleEntry {
    fn from_json(index: usize, mut entry: JsonValue) -> Result<Self, FhirError> {
        let full_url = entry
            .get("fullUrl")
            .and_then(JsonValue::as_str)
            .map(str::to_string);

        let resource = match entry.get_mut("resource").map(JsonValue::take) {
            Some(resource @ JsonValue::Object(_)) => resource,
            _ => {
                return Err(FhirError::InvalidBundle(format!(
                    "entry[{}] has no resource",
                    index
                )));
            }
        };

        let kind = resource
            .get("resourceType")
            .and_then(JsonValue::as_str)
            .map(ResourceKind::from_resource_type)
            .ok_or_else(|| {
                FhirError::InvalidBundle(format!("entry[{}] resource has no resourceType", index))
            })?;

        Ok(Self {
            full_url,
            kind,
            resource,
        })
    }
}

/// FHIR Bundle as read by the importer.
///
/// Only `entry` is interpreted; the bundle `type`, links and totals are
/// irrelevant to the projection and are not retained.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub entry: Vec<BundleEntry>,
}

/// Bundle entries grouped by kind, each group in original relative order
#[derive(Debug, Default)]
pub struct Partitioned<'a> {
    pub patients: Vec<&'a BundleEntry>,
    pub encounters: Vec<&'a BundleEntry>,
    pub diagnostic_reports: Vec<&'a BundleEntry>,
    pub ignored: usize,
}

impl Bundle {
    /// Parse bundle text.
    ///
    /// Fails with `MalformedInput` when the text is not JSON and with
    /// `InvalidBundle` when there is no `entry` array or an entry lacks a
    /// typed resource.
    pub fn parse(text: &str) -> Result<Self, FhirError> {
        let mut value: JsonValue = serde_json::from_str(text).map_err(FhirError::MalformedInput)?;

        let entries = match value.get_mut("entry").map(JsonValue::take) {
            Some(JsonValue::Array(entries)) => entries,
            Some(_) => {
                return Err(FhirError::InvalidBundle(
                    "`entry` is not an array".to_string(),
                ));
            }
            None => {
                return Err(FhirError::InvalidBundle(
                    "missing `entry` array".to_string(),
                ));
            }
        };

        let entry = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| BundleEntry::from_json(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entry })
    }

    /// Group entries into Patients, Encounters and DiagnosticReports.
    pub fn partition(&self) -> Partitioned<'_> {
        let mut groups = Partitioned::default();
        for entry in &self.entry {
            match entry.kind {
                ResourceKind::Patient => groups.patients.push(entry),
                ResourceKind::Encounter => groups.encounters.push(entry),
                ResourceKind::DiagnosticReport => groups.diagnostic_reports.push(entry),
                ResourceKind::Other(_) => groups.ignored += 1,
            }
        }
        groups
    }
}
