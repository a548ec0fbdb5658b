use anyhow::{Context, Result};
use std::collections::HashMap;

/// Environment-driven configuration for the model gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    pub api_key: String,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl GatewaySettings {
    const API_KEY_ENV: &'static str = "AGROLENS_API_KEY";
    const ENDPOINT_ENV: &'static str = "AGROLENS_ENDPOINT";
    const MODEL_ENV: &'static str = "AGROLENS_MODEL";
    const TIMEOUT_ENV: &'static str = "AGROLENS_TIMEOUT_SECS";

    /// Load settings from environment variables.
    ///
    /// * `AGROLENS_API_KEY` — model API key (required).
    /// * `AGROLENS_ENDPOINT` — optional custom base URL.
    /// * `AGROLENS_MODEL` — optional model override.
    /// * `AGROLENS_TIMEOUT_SECS` — optional HTTP timeout.
    pub fn from_env() -> Result<Self> {
        Self::from_map(std::env::vars().collect())
    }

    fn from_map(vars: HashMap<String, String>) -> Result<Self> {
        let api_key = vars
            .get(Self::API_KEY_ENV)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .with_context(|| {
                format!("environment variable {} must be set", Self::API_KEY_ENV)
            })?;
        let endpoint = vars
            .get(Self::ENDPOINT_ENV)
            .cloned()
            .filter(|v| !v.trim().is_empty());
        let model = vars
            .get(Self::MODEL_ENV)
            .cloned()
            .filter(|v| !v.trim().is_empty());
        let timeout_secs = vars
            .get(Self::TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok());

        Ok(Self {
            api_key,
            endpoint,
            model,
            timeout_secs,
        })
    }
}
