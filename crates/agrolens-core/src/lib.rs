pub mod gateway;
pub mod pipeline;
pub mod store;

pub use gateway::{gemini::GeminiGateway, GatewaySettings, ModelGateway, StaticGateway};
pub use pipeline::{
    profile::{DomainProfile, GenerationParams},
    AnalysisOutcome, AnalysisPipeline, AnalysisRecord, AnalysisRequest, AnalysisResult,
    Attachment, Domain, FieldValue, ModelResponse, PipelineError, Prompt,
};
pub use store::{
    supabase::{SupabaseSettings, SupabaseStore},
    MemoryStore, ResultStore,
};
