//! Lenient views of the FHIR resources the importer reads.
//!
//! Only the elements the EMR projection needs are modelled. Everything else
//! in a resource is ignored, and absent elements deserialize to their
//! defaults instead of failing.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::FhirError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Option<String>,
    #[serde(default)]
    pub name: Vec<HumanName>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    #[serde(default)]
    pub address: Vec<Address>,
    #[serde(default)]
    pub telecom: Vec<ContactPoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HumanName {
    pub family: Option<String>,
    #[serde(default)]
    pub given: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub line: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactPoint {
    pub system: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    pub id: Option<String>,
    pub status: Option<String>,
    pub subject: Option<Reference>,
    pub period: Option<Period>,
    #[serde(rename = "type", default)]
    pub types: Vec<CodeableConcept>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    pub id: Option<String>,
    pub subject: Option<Reference>,
    pub effective_date_time: Option<String>,
    #[serde(default)]
    pub presented_form: Vec<Attachment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reference {
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Period {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeableConcept {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: Option<String>,
    pub data: Option<String>,
}

fn from_resource<'a, T: Deserialize<'a>>(
    resource_type: &'static str,
    value: &'a JsonValue,
) -> Result<T, FhirError> {
    T::deserialize(value).map_err(|e| FhirError::invalid_resource(resource_type, e.to_string()))
}

impl Patient {
    pub fn from_json(value: &JsonValue) -> Result<Self, FhirError> {
        from_resource("Patient", value)
    }

    /// Value of the first telecom entry with the given system
    pub fn telecom_value(&self, system: &str) -> Option<&str> {
        self.telecom
            .iter()
            .find(|t| t.system.as_deref() == Some(system))
            .and_then(|t| t.value.as_deref())
    }
}

impl Encounter {
    pub fn from_json(value: &JsonValue) -> Result<Self, FhirError> {
        from_resource("Encounter", value)
    }

    pub fn subject_reference(&self) -> Option<&str> {
        self.subject.as_ref()?.reference.as_deref()
    }
}

impl DiagnosticReport {
    pub fn from_json(value: &JsonValue) -> Result<Self, FhirError> {
        from_resource("DiagnosticReport", value)
    }

    pub fn subject_reference(&self) -> Option<&str> {
        self.subject.as_ref()?.reference.as_deref()
    }
}
