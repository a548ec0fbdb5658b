use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GatewaySettings, ModelGateway};
use crate::pipeline::profile::GenerationParams;
use crate::pipeline::{ModelResponse, PipelineError, Prompt};

const TOP_K: u32 = 1;
const TOP_P: f32 = 1.0;

/// Gemini `generateContent` client. Text prompt plus optional inline image
/// parts, authenticated with the API key as a query parameter.
#[derive(Debug, Clone)]
pub struct GeminiGateway {
    http: Client,
    url: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiGateway {
    pub fn new(settings: &GatewaySettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            bail!("Gemini API key must be provided via AGROLENS_API_KEY");
        }
        let base = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string());
        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| "gemini-1.5-flash-latest".to_string());
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            base.trim_end_matches('/'),
            model
        );
        let timeout = Duration::from_secs(settings.timeout_secs.unwrap_or(30));
        let http = Client::builder()
            .user_agent("agrolens/0.3")
            .timeout(timeout)
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            http,
            url,
            api_key: settings.api_key.clone(),
            timeout,
        })
    }

    fn request_error(&self, err: reqwest::Error) -> PipelineError {
        if err.is_timeout() {
            return PipelineError::GatewayTimeout {
                timeout: self.timeout,
            };
        }
        PipelineError::Gateway {
            status: "request failed".to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    async fn generate(
        &self,
        prompt: &Prompt,
        params: &GenerationParams,
    ) -> Result<ModelResponse, PipelineError> {
        let payload = GeminiRequest::from_prompt(prompt, params);

        let response = self
            .http
            .post(&self.url)
            .query(&[("key", &self.api_key)])
            .json(&payload)
            .send()
            .await
            .map_err(|err| self.request_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Gateway {
                status: status.to_string(),
                message: body,
            });
        }

        let message: GeminiResponse = response.json().await.map_err(|err| {
            PipelineError::Gateway {
                status: "malformed body".to_string(),
                message: err.to_string(),
            }
        })?;
        let text = message
            .candidates
            .into_iter()
            .flat_map(|candidate| candidate.content.parts)
            .filter_map(|part| part.text)
            .next()
            .ok_or_else(|| PipelineError::Gateway {
                status: "empty response".to_string(),
                message: "Gemini response missing generated text".to_string(),
            })?;

        Ok(ModelResponse { text })
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiRequestContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

impl GeminiRequest {
    fn from_prompt(prompt: &Prompt, params: &GenerationParams) -> Self {
        let mut parts = vec![GeminiRequestPart {
            text: Some(prompt.text.clone()),
            inline_data: None,
        }];
        for attachment in &prompt.attachments {
            parts.push(GeminiRequestPart {
                text: None,
                inline_data: Some(GeminiInlineData {
                    mime_type: attachment.mime_type.clone(),
                    data: attachment.data.clone(),
                }),
            });
        }
        Self {
            contents: vec![GeminiRequestContent { parts }],
            generation_config: GeminiGenerationConfig {
                temperature: params.temperature,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: params.max_output_tokens,
            },
        }
    }
}

#[derive(Serialize)]
struct GeminiRequestContent {
    parts: Vec<GeminiRequestPart>,
}

#[derive(Serialize)]
struct GeminiRequestPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Serialize)]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}
