//! Axum router and handlers: one POST endpoint per analysis domain plus a
//! retrieval endpoint, with permissive CORS for browser clients.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use agrolens_core::{AnalysisPipeline, AnalysisRequest, Domain, DomainProfile, PipelineError};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
}

/// Create the application router. The CORS layer answers the browser
/// preflight (`OPTIONS`) for every route.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/climate-predictions", post(climate_predictions))
        .route("/disease-detection", post(disease_detection))
        .route("/market-intelligence", post(market_intelligence))
        .route("/microplastic-detection", post(microplastic_detection))
        .route("/voice-query", post(voice_query))
        .route("/results/{domain}", get(recent_results))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn climate_predictions(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    analyze(state, Domain::Climate, body).await
}

async fn disease_detection(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    analyze(state, Domain::Disease, body).await
}

async fn market_intelligence(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    analyze(state, Domain::Market, body).await
}

async fn microplastic_detection(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    analyze(state, Domain::Microplastic, body).await
}

async fn voice_query(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    analyze(state, Domain::Voice, body).await
}

async fn analyze(state: AppState, domain: Domain, body: Value) -> (StatusCode, Json<Value>) {
    let request = AnalysisRequest::from_body(domain, body);
    match state.pipeline.run(request).await {
        Ok(outcome) => {
            let profile = DomainProfile::get(domain);
            let mut response = Map::new();
            response.insert(
                profile.response_key.to_string(),
                Value::String(outcome.analysis),
            );
            for (name, value) in &outcome.extracted {
                response.insert(name.clone(), value.into());
            }
            response.insert("id".to_string(), Value::String(outcome.id));
            response.insert("success".to_string(), Value::Bool(true));
            (StatusCode::OK, Json(Value::Object(response)))
        }
        Err(err) => failure(domain, err),
    }
}

#[derive(Deserialize)]
struct RecentQuery {
    farmer_id: String,
}

async fn recent_results(
    State(state): State<AppState>,
    Path(domain): Path<Domain>,
    Query(query): Query<RecentQuery>,
) -> (StatusCode, Json<Value>) {
    match state.pipeline.recent(&query.farmer_id, domain).await {
        Ok(results) => (
            StatusCode::OK,
            Json(json!({ "results": results, "success": true })),
        ),
        Err(err) => failure(domain, err),
    }
}

fn failure(domain: Domain, err: PipelineError) -> (StatusCode, Json<Value>) {
    tracing::error!(domain = domain.as_str(), error = %err, "analysis request failed");
    (
        error_status(&err),
        Json(json!({ "error": err.to_string(), "success": false })),
    )
}

/// Client-caused failures get a 4xx; upstream and storage failures keep 5xx.
fn error_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::MissingField { .. } => StatusCode::BAD_REQUEST,
        PipelineError::Gateway { .. } => StatusCode::BAD_GATEWAY,
        PipelineError::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
