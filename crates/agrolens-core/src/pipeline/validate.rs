use serde_json::Value;

use super::profile::DomainProfile;
use super::{AnalysisRequest, PipelineError};

/// Check required fields in a fixed order, `farmer_id` first for every
/// domain. Fails with the first missing field encountered; leaves the
/// request untouched and performs no I/O.
///
/// A field counts as present when it is a non-empty string or a JSON
/// object. Anything else (absent, null, blank, array, number) is treated
/// as missing so the failure surfaces before any external call is made.
pub fn validate(profile: &DomainProfile, request: &AnalysisRequest) -> Result<(), PipelineError> {
    if request.farmer_id.trim().is_empty() {
        return Err(missing("farmer_id"));
    }
    for name in profile.required_fields {
        match request.fields.get(*name) {
            Some(Value::String(s)) if !s.trim().is_empty() => {}
            Some(Value::Object(_)) => {}
            _ => return Err(missing(name)),
        }
    }
    Ok(())
}

fn missing(field: &str) -> PipelineError {
    PipelineError::MissingField {
        field: field.to_string(),
    }
}
