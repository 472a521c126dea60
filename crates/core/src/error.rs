use thiserror::Error;

/// Errors raised while reading a FHIR bundle or projecting its resources
#[derive(Debug, Error)]
pub enum FhirError {
    /// The input is not JSON at all
    #[error("Malformed bundle: {0}")]
    MalformedInput(#[source] serde_json::Error),

    /// Valid JSON, but not shaped like a bundle
    #[error("Invalid FHIR bundle format: {0}")]
    InvalidBundle(String),

    /// A recognised resource that cannot be mapped onto the EMR schema
    #[error("Invalid {resource_type} resource: {reason}")]
    InvalidResource {
        resource_type: &'static str,
        reason: String,
    },
}

impl FhirError {
    pub(crate) fn invalid_resource(resource_type: &'static str, reason: impl Into<String>) -> Self {
        FhirError::InvalidResource {
            resource_type,
            reason: reason.into(),
        }
    }
}
