use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use agrolens_core::{
    AnalysisPipeline, GeminiGateway, MemoryStore, ModelGateway, ResultStore, StaticGateway,
    SupabaseStore,
};

mod app;
mod settings;

const OFFLINE_TEXT: &str =
    "Offline mode: no model configured. Alert level: medium. Confidence: 75%";

#[derive(Parser, Debug)]
#[command(
    name = "agrolens-server",
    author,
    version,
    about = "AI crop analysis service"
)]
struct Cli {
    /// Socket address to bind
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:8787")]
    bind: SocketAddr,

    /// Optional TOML config file layered over AGROLENS_* environment settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Upper bound for one model call (e.g. "30s", "500ms")
    #[arg(long, value_name = "DURATION", default_value = "30s", value_parser = humantime::parse_duration)]
    model_timeout: Duration,

    /// Serve canned model output against the in-memory store instead of
    /// requiring Gemini and Supabase credentials
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (gateway, store): (Arc<dyn ModelGateway>, Arc<dyn ResultStore>) = if cli.offline {
        tracing::warn!("running offline: canned model output, in-memory persistence");
        (
            Arc::new(StaticGateway::new(OFFLINE_TEXT)),
            Arc::new(MemoryStore::new()),
        )
    } else {
        let overrides = settings::load(cli.config.as_deref())?;
        let gateway_settings = overrides.gateway_settings()?;
        let supabase_settings = overrides.supabase_settings()?;
        (
            Arc::new(GeminiGateway::new(&gateway_settings)?),
            Arc::new(SupabaseStore::new(&supabase_settings)?),
        )
    };

    let pipeline = Arc::new(AnalysisPipeline::with_timeout(
        gateway,
        store,
        cli.model_timeout,
    ));
    let router = app::router(app::AppState { pipeline });

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    tracing::info!("agrolens listening on http://{}", cli.bind);
    axum::serve(listener, router).await?;
    Ok(())
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn model_timeout_parses_humantime_values() {
        let cli = Cli::parse_from(["agrolens-server", "--model-timeout", "500ms", "--offline"]);
        assert_eq!(cli.model_timeout, Duration::from_millis(500));
        assert!(cli.offline);
    }
}
