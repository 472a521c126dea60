/// A subject reference pointing at a patient.
///
/// Accepts relative references (`Patient/123`, `Patient/123/_history/2`)
/// and `urn:uuid:` URNs as used inside transaction bundles. The resource
/// type segment is not checked; only the identifier is used for lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatientReference<'a> {
    id: &'a str,
}

const UUID_URN_PREFIX: &str = "urn:uuid:";

impl<'a> PatientReference<'a> {
    /// Extract the identifier from a reference string, if there is one
    pub fn parse(reference: &'a str) -> Option<Self> {
        let id = match reference.strip_prefix(UUID_URN_PREFIX) {
            Some(id) => id,
            None => reference.split('/').nth(1)?,
        };

        if id.is_empty() {
            None
        } else {
            Some(Self { id })
        }
    }

    pub fn id(&self) -> &'a str {
        self.id
    }
}
