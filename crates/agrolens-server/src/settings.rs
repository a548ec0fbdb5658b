//! Optional TOML config file layered over `AGROLENS_*` environment
//! variables. File values win where both are present; the API key and the
//! Supabase credentials may come from either side.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use agrolens_core::{GatewaySettings, SupabaseSettings};

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default)]
    gateway: GatewayOverrides,
    #[serde(default)]
    store: StoreOverrides,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayOverrides {
    api_key: Option<String>,
    endpoint: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StoreOverrides {
    url: Option<String>,
    service_key: Option<String>,
}

/// Read the config file when one was given; otherwise an empty overlay.
pub fn load(path: Option<&Path>) -> Result<ServerSettings> {
    let Some(path) = path else {
        return Ok(ServerSettings::default());
    };
    let raw = config::Config::builder()
        .add_source(config::File::from(path))
        .build()
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    raw.try_deserialize()
        .context("invalid config file structure")
}

impl ServerSettings {
    pub fn gateway_settings(&self) -> Result<GatewaySettings> {
        let mut settings = match GatewaySettings::from_env() {
            Ok(settings) => settings,
            // An api_key in the file stands in for the env var.
            Err(err) => match non_blank(&self.gateway.api_key) {
                Some(api_key) => GatewaySettings {
                    api_key,
                    endpoint: None,
                    model: None,
                    timeout_secs: None,
                },
                None => return Err(err),
            },
        };
        if let Some(api_key) = non_blank(&self.gateway.api_key) {
            settings.api_key = api_key;
        }
        if let Some(endpoint) = non_blank(&self.gateway.endpoint) {
            settings.endpoint = Some(endpoint);
        }
        if let Some(model) = non_blank(&self.gateway.model) {
            settings.model = Some(model);
        }
        if let Some(timeout_secs) = self.gateway.timeout_secs {
            settings.timeout_secs = Some(timeout_secs);
        }
        Ok(settings)
    }

    pub fn supabase_settings(&self) -> Result<SupabaseSettings> {
        let from_file = (non_blank(&self.store.url), non_blank(&self.store.service_key));
        if let (Some(url), Some(service_key)) = from_file {
            return Ok(SupabaseSettings { url, service_key });
        }
        let mut settings = SupabaseSettings::from_env()?;
        if let Some(url) = non_blank(&self.store.url) {
            settings.url = url;
        }
        if let Some(service_key) = non_blank(&self.store.service_key) {
            settings.service_key = service_key;
        }
        Ok(settings)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .filter(|v| !v.trim().is_empty())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn absent_file_yields_empty_overlay() {
        let settings = load(None).unwrap();
        assert!(settings.gateway.api_key.is_none());
        assert!(settings.store.url.is_none());
    }

    #[test]
    fn toml_sections_are_deserialized() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        fs::write(
            file.path(),
            r#"
[gateway]
api_key = "file-key"
model = "gemini-test"

[store]
url = "http://localhost:54321"
service_key = "service-key"
"#,
        )
        .unwrap();

        let settings = load(Some(file.path())).unwrap();
        assert_eq!(settings.gateway.api_key.as_deref(), Some("file-key"));
        assert_eq!(settings.gateway.model.as_deref(), Some("gemini-test"));

        let supabase = settings.supabase_settings().unwrap();
        assert_eq!(supabase.url, "http://localhost:54321");
        assert_eq!(supabase.service_key, "service-key");
    }

    #[test]
    fn file_api_key_stands_in_for_environment() {
        let settings = ServerSettings {
            gateway: GatewayOverrides {
                api_key: Some("file-key".into()),
                endpoint: None,
                model: None,
                timeout_secs: Some(12),
            },
            store: StoreOverrides::default(),
        };
        // No AGROLENS_API_KEY is set when tests run in isolation; either way
        // the file key must win.
        let gateway = settings.gateway_settings().unwrap();
        assert_eq!(gateway.api_key, "file-key");
        assert_eq!(gateway.timeout_secs, Some(12));
    }

    #[test]
    fn missing_credentials_everywhere_is_an_error() {
        let settings = ServerSettings::default();
        assert!(settings.supabase_settings().is_err());
    }
}
