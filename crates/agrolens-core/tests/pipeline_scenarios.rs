use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use agrolens_core::{
    AnalysisPipeline, AnalysisRecord, AnalysisRequest, AnalysisResult, Domain, FieldValue,
    GenerationParams, MemoryStore, ModelGateway, ModelResponse, PipelineError, Prompt,
    ResultStore, StaticGateway,
};

/// Gateway that counts invocations before delegating to a canned response.
struct CountingGateway {
    inner: StaticGateway,
    calls: AtomicUsize,
}

impl CountingGateway {
    fn new(text: &str) -> Self {
        Self {
            inner: StaticGateway::new(text),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelGateway for CountingGateway {
    async fn generate(
        &self,
        prompt: &Prompt,
        params: &GenerationParams,
    ) -> Result<ModelResponse, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.generate(prompt, params).await
    }
}

/// Gateway that never answers within a test-sized timeout.
struct SlowGateway;

#[async_trait]
impl ModelGateway for SlowGateway {
    async fn generate(
        &self,
        _prompt: &Prompt,
        _params: &GenerationParams,
    ) -> Result<ModelResponse, PipelineError> {
        tokio::time::sleep(Duration::from_millis(250)).await;
        Ok(ModelResponse {
            text: "too late".into(),
        })
    }
}

/// Store whose writes always fail.
struct FailingStore;

#[async_trait]
impl ResultStore for FailingStore {
    async fn append(&self, _record: &AnalysisRecord) -> Result<String, PipelineError> {
        Err(PipelineError::Persistence {
            message: "insert rejected".into(),
        })
    }

    async fn recent(
        &self,
        _farmer_id: &str,
        _domain: Domain,
    ) -> Result<Vec<AnalysisResult>, PipelineError> {
        Ok(Vec::new())
    }
}

fn disease_request() -> AnalysisRequest {
    AnalysisRequest::from_body(
        Domain::Disease,
        json!({
            "farmer_id": "f1",
            "crop_name": "Rice",
            "symptoms": "yellow leaf spots",
        }),
    )
}

fn climate_request() -> AnalysisRequest {
    AnalysisRequest::from_body(
        Domain::Climate,
        json!({
            "farmer_id": "f1",
            "location_data": { "district": "Palakkad" },
        }),
    )
}

#[tokio::test]
async fn missing_field_fails_before_any_model_call() {
    let gateway = Arc::new(CountingGateway::new("should never be seen"));
    let pipeline = AnalysisPipeline::new(gateway.clone(), Arc::new(MemoryStore::new()));

    let request = AnalysisRequest::from_body(Domain::Disease, json!({ "farmer_id": "f1" }));
    let err = pipeline.run(request).await.unwrap_err();

    assert!(
        matches!(&err, PipelineError::MissingField { field } if field == "crop_name"),
        "unexpected error: {err:?}"
    );
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn disease_confidence_marker_is_extracted_and_stored() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = AnalysisPipeline::new(
        Arc::new(StaticGateway::new(
            "Likely blast disease. Confidence: 82% based on the lesions described.",
        )),
        store.clone(),
    );

    let outcome = pipeline.run(disease_request()).await.unwrap();
    assert_eq!(
        outcome.extracted.get("confidence_score"),
        Some(&FieldValue::Number(0.82))
    );

    let stored = store.recent("f1", Domain::Disease).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored[0].extracted.get("confidence_score"),
        Some(&FieldValue::Number(0.82))
    );
}

#[tokio::test]
async fn disease_without_marker_stores_documented_default() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = AnalysisPipeline::new(
        Arc::new(StaticGateway::new(
            "The leaves show fungal spotting; treat with a copper-based fungicide.",
        )),
        store.clone(),
    );

    let outcome = pipeline.run(disease_request()).await.unwrap();
    assert_eq!(
        outcome.extracted.get("confidence_score"),
        Some(&FieldValue::Number(0.75))
    );
}

#[tokio::test]
async fn climate_alert_marker_is_extracted_with_default_fallback() {
    let pipeline = AnalysisPipeline::new(
        Arc::new(StaticGateway::new(
            "Heavy monsoon incoming. Alert level: high because of flooding risk.",
        )),
        Arc::new(MemoryStore::new()),
    );
    let outcome = pipeline.run(climate_request()).await.unwrap();
    assert_eq!(
        outcome.extracted.get("alert_level"),
        Some(&FieldValue::Text("high".into()))
    );

    let pipeline = AnalysisPipeline::new(
        Arc::new(StaticGateway::new("Mild week ahead, irrigate as usual.")),
        Arc::new(MemoryStore::new()),
    );
    let outcome = pipeline.run(climate_request()).await.unwrap();
    assert_eq!(
        outcome.extracted.get("alert_level"),
        Some(&FieldValue::Text("medium".into()))
    );
}

#[tokio::test]
async fn slow_gateway_times_out_and_stores_nothing() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = AnalysisPipeline::with_timeout(
        Arc::new(SlowGateway),
        store.clone(),
        Duration::from_millis(1),
    );

    let err = pipeline.run(climate_request()).await.unwrap_err();
    assert!(matches!(err, PipelineError::GatewayTimeout { .. }));
    assert!(store.recent("f1", Domain::Climate).await.unwrap().is_empty());
}

#[tokio::test]
async fn persistence_failure_propagates_after_single_model_call() {
    let gateway = Arc::new(CountingGateway::new("Alert level: low"));
    let pipeline = AnalysisPipeline::new(gateway.clone(), Arc::new(FailingStore));

    let err = pipeline.run(climate_request()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Persistence { .. }));
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn market_and_voice_run_without_extraction_tables() {
    let pipeline = AnalysisPipeline::new(
        Arc::new(StaticGateway::new("Prices trending upward this season.")),
        Arc::new(MemoryStore::new()),
    );

    let market = AnalysisRequest::from_body(
        Domain::Market,
        json!({ "farmer_id": "f1", "crop_name": "Pepper" }),
    );
    let outcome = pipeline.run(market).await.unwrap();
    assert!(outcome.extracted.is_empty());

    let voice = AnalysisRequest::from_body(
        Domain::Voice,
        json!({ "farmer_id": "f1", "query": "When should I transplant paddy?" }),
    );
    let outcome = pipeline.run(voice).await.unwrap();
    assert!(outcome.extracted.is_empty());
    assert!(outcome.analysis.contains("upward"));
}
