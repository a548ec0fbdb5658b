use std::{collections::BTreeMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument, trace};

pub mod extract;
pub mod profile;
pub mod prompt;
pub mod validate;

use crate::gateway::ModelGateway;
use crate::store::ResultStore;
use profile::DomainProfile;

/// Which analysis feature a request belongs to.
///
/// Declaration order is load-bearing: it indexes the static profile table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Climate,
    Disease,
    Market,
    Microplastic,
    Voice,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Climate,
        Domain::Disease,
        Domain::Market,
        Domain::Microplastic,
        Domain::Voice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Climate => "climate",
            Domain::Disease => "disease",
            Domain::Market => "market",
            Domain::Microplastic => "microplastic",
            Domain::Voice => "voice",
        }
    }
}

/// Image payload forwarded to the model as an inline attachment. The bytes
/// stay base64-encoded end to end: clients submit base64 and the model API
/// expects base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub mime_type: String,
    pub data: String,
}

/// Inbound analysis payload after JSON decoding, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub farmer_id: String,
    pub domain: Domain,
    /// Domain-specific fields, everything the client sent except the
    /// identity and image keys.
    pub fields: Map<String, Value>,
    pub image: Option<Attachment>,
}

impl AnalysisRequest {
    /// Decode a raw JSON body for the given domain. `farmer_id` and
    /// `image_data` are lifted out of the object; everything else stays in
    /// `fields`. A missing or non-string identity becomes the empty string
    /// and is caught by validation.
    pub fn from_body(domain: Domain, body: Value) -> Self {
        let mut fields = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let farmer_id = fields
            .remove("farmer_id")
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        let image = fields
            .remove("image_data")
            .and_then(|v| v.as_str().map(str::to_owned))
            .map(|data| Attachment {
                mime_type: "image/jpeg".to_string(),
                data,
            });
        Self {
            farmer_id,
            domain,
            fields,
            image,
        }
    }

    pub(crate) fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// Immutable rendered instruction plus any attachments. Built once per
/// request; attachments ride alongside the text, never inlined into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// Raw text returned by the generative model for one request. Lives only for
/// the duration of that request; failures travel as [`PipelineError`].
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub text: String,
}

/// Extracted structured value: one of a closed label set, or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl From<&FieldValue> for Value {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Number(n) => serde_json::json!(n),
        }
    }
}

/// Failure taxonomy for one pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Client omitted (or blanked) a required field. Named deterministically:
    /// the first missing field in the domain's fixed check order.
    #[error("missing required field `{field}`")]
    MissingField { field: String },
    /// The model endpoint failed or returned an unusable body.
    #[error("model gateway failure ({status}): {message}")]
    Gateway { status: String, message: String },
    /// The model call exceeded the configured bound.
    #[error("model call timed out after {timeout:?}")]
    GatewayTimeout { timeout: Duration },
    /// The result could not be persisted. The model call already succeeded;
    /// the caller decides whether to resubmit.
    #[error("failed to persist analysis result: {message}")]
    Persistence { message: String },
}

/// Unsaved record handed to the store: original input, raw model text, and
/// the extracted field mapping.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRecord {
    pub farmer_id: String,
    pub domain: Domain,
    pub request: Map<String, Value>,
    pub analysis: String,
    pub extracted: BTreeMap<String, FieldValue>,
}

/// Persisted record as returned on retrieval. Never updated in place;
/// corrections are new records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: String,
    pub farmer_id: String,
    pub domain: Domain,
    pub request: Map<String, Value>,
    pub analysis: String,
    pub extracted: BTreeMap<String, FieldValue>,
    pub created_at: DateTime<Utc>,
}

/// What a successful pipeline run hands back to the HTTP layer.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub id: String,
    pub analysis: String,
    pub extracted: BTreeMap<String, FieldValue>,
}

/// Linear per-request pipeline: validate, build the prompt, call the model
/// under a bounded timeout, extract markers, persist. No state is shared
/// between runs.
pub struct AnalysisPipeline {
    gateway: Arc<dyn ModelGateway>,
    store: Arc<dyn ResultStore>,
    call_timeout: Duration,
}

impl AnalysisPipeline {
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(gateway: Arc<dyn ModelGateway>, store: Arc<dyn ResultStore>) -> Self {
        Self::with_timeout(gateway, store, Self::DEFAULT_CALL_TIMEOUT)
    }

    pub fn with_timeout(
        gateway: Arc<dyn ModelGateway>,
        store: Arc<dyn ResultStore>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            store,
            call_timeout,
        }
    }

    /// Run one request to completion or to the first failure. Nothing is
    /// retried here; a failed request is reported and the caller resubmits.
    #[instrument(
        name = "analyze",
        skip_all,
        fields(domain = request.domain.as_str(), farmer = %request.farmer_id)
    )]
    pub async fn run(&self, request: AnalysisRequest) -> Result<AnalysisOutcome, PipelineError> {
        let profile = DomainProfile::get(request.domain);
        validate::validate(profile, &request)?;

        let prompt = prompt::build(profile, &request);
        trace!(
            prompt_len = prompt.text.len(),
            attachments = prompt.attachments.len(),
            "prompt assembled"
        );

        let response = tokio::time::timeout(
            self.call_timeout,
            self.gateway.generate(&prompt, &profile.generation),
        )
        .await
        .map_err(|_| PipelineError::GatewayTimeout {
            timeout: self.call_timeout,
        })??;

        let extracted = extract::extract(&response.text, &profile.field_specs);
        debug!(
            analysis_len = response.text.len(),
            extracted = extracted.len(),
            "model response extracted"
        );

        let AnalysisRequest {
            farmer_id,
            domain,
            fields,
            ..
        } = request;
        let record = AnalysisRecord {
            farmer_id,
            domain,
            request: fields,
            analysis: response.text,
            extracted,
        };
        let id = self.store.append(&record).await?;
        debug!(%id, "analysis stored");

        Ok(AnalysisOutcome {
            id,
            analysis: record.analysis,
            extracted: record.extracted,
        })
    }

    /// Stored results for one requester in one domain, most recent first.
    pub async fn recent(
        &self,
        farmer_id: &str,
        domain: Domain,
    ) -> Result<Vec<AnalysisResult>, PipelineError> {
        self.store.recent(farmer_id, domain).await
    }
}
