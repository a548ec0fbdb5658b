use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::ResultStore;
use crate::pipeline::profile::DomainProfile;
use crate::pipeline::{AnalysisRecord, AnalysisResult, Domain, FieldValue, PipelineError};

/// Environment-driven configuration for the Supabase-backed store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseSettings {
    pub url: String,
    pub service_key: String,
}

impl SupabaseSettings {
    const URL_ENV: &'static str = "AGROLENS_SUPABASE_URL";
    const KEY_ENV: &'static str = "AGROLENS_SUPABASE_SERVICE_KEY";

    /// Load settings from environment variables.
    ///
    /// * `AGROLENS_SUPABASE_URL` — project base URL (required).
    /// * `AGROLENS_SUPABASE_SERVICE_KEY` — service-role key (required).
    pub fn from_env() -> Result<Self> {
        Self::from_map(std::env::vars().collect())
    }

    fn from_map(vars: HashMap<String, String>) -> Result<Self> {
        let url = vars
            .get(Self::URL_ENV)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .with_context(|| format!("environment variable {} must be set", Self::URL_ENV))?;
        let service_key = vars
            .get(Self::KEY_ENV)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .with_context(|| format!("environment variable {} must be set", Self::KEY_ENV))?;
        Ok(Self { url, service_key })
    }
}

/// PostgREST-backed store: one table per domain, uniform schema-flexible
/// columns (`farmer_id`, `request`, `analysis`, `extracted`, `created_at`).
/// Ids and timestamps are assigned server-side.
pub struct SupabaseStore {
    http: Client,
    base: String,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(settings: &SupabaseSettings) -> Result<Self> {
        let http = Client::builder()
            .user_agent("agrolens/0.3")
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build Supabase HTTP client")?;
        Ok(Self {
            http,
            base: settings.url.trim_end_matches('/').to_string(),
            service_key: settings.service_key.clone(),
        })
    }

    fn table_url(&self, domain: Domain) -> String {
        format!("{}/rest/v1/{}", self.base, DomainProfile::get(domain).table)
    }
}

#[async_trait]
impl ResultStore for SupabaseStore {
    async fn append(&self, record: &AnalysisRecord) -> Result<String, PipelineError> {
        let row = json!({
            "farmer_id": record.farmer_id,
            "request": record.request,
            "analysis": record.analysis,
            "extracted": record.extracted,
        });
        let response = self
            .http
            .post(self.table_url(record.domain))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await
            .map_err(persistence)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Persistence {
                message: format!("insert rejected ({status}): {body}"),
            });
        }

        let rows: Vec<InsertedRow> = response.json().await.map_err(persistence)?;
        rows.into_iter()
            .next()
            .map(|row| id_string(row.id))
            .ok_or_else(|| PipelineError::Persistence {
                message: "insert returned no representation".to_string(),
            })
    }

    async fn recent(
        &self,
        farmer_id: &str,
        domain: Domain,
    ) -> Result<Vec<AnalysisResult>, PipelineError> {
        let filter = format!("eq.{farmer_id}");
        let response = self
            .http
            .get(self.table_url(domain))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .query(&[
                ("select", "*"),
                ("farmer_id", filter.as_str()),
                ("order", "created_at.desc"),
            ])
            .send()
            .await
            .map_err(persistence)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Persistence {
                message: format!("query rejected ({status}): {body}"),
            });
        }

        let rows: Vec<StoredRow> = response.json().await.map_err(persistence)?;
        Ok(rows.into_iter().map(|row| row.into_result(domain)).collect())
    }
}

fn persistence(err: reqwest::Error) -> PipelineError {
    PipelineError::Persistence {
        message: err.to_string(),
    }
}

fn id_string(id: Value) -> String {
    match id {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[derive(Deserialize)]
struct InsertedRow {
    id: Value,
}

#[derive(Deserialize)]
struct StoredRow {
    id: Value,
    farmer_id: String,
    #[serde(default)]
    request: Map<String, Value>,
    #[serde(default)]
    analysis: String,
    #[serde(default)]
    extracted: BTreeMap<String, FieldValue>,
    created_at: DateTime<Utc>,
}

impl StoredRow {
    fn into_result(self, domain: Domain) -> AnalysisResult {
        AnalysisResult {
            id: id_string(self.id),
            farmer_id: self.farmer_id,
            domain,
            request: self.request,
            analysis: self.analysis,
            extracted: self.extracted,
            created_at: self.created_at,
        }
    }
}
