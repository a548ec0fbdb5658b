mod settings;

pub mod gemini;

use async_trait::async_trait;

use crate::pipeline::profile::GenerationParams;
use crate::pipeline::{ModelResponse, PipelineError, Prompt};

pub use settings::GatewaySettings;

/// Transport seam to the external generative model. Implementations perform
/// a single outbound call with no business-logic branching and no retry
/// policy; retries, if any, belong to the caller.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send the assembled prompt and return the raw generated text.
    async fn generate(
        &self,
        prompt: &Prompt,
        params: &GenerationParams,
    ) -> Result<ModelResponse, PipelineError>;
}

/// Canned-response gateway for tests and offline runs.
#[derive(Debug, Clone)]
pub struct StaticGateway {
    text: String,
}

impl StaticGateway {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl ModelGateway for StaticGateway {
    async fn generate(
        &self,
        _prompt: &Prompt,
        _params: &GenerationParams,
    ) -> Result<ModelResponse, PipelineError> {
        Ok(ModelResponse {
            text: self.text.clone(),
        })
    }
}
