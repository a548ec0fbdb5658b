use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::pipeline::{AnalysisRecord, AnalysisResult, Domain, PipelineError};

pub mod supabase;

/// Append-only persistence for analysis results. Each write is a single
/// independent insert with no read-modify-write step, so concurrent
/// pipeline runs never contend on shared state here.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persist one result with a server-assigned id and creation timestamp,
    /// returning the stored id. Either the full record is stored or none of
    /// it is.
    async fn append(&self, record: &AnalysisRecord) -> Result<String, PipelineError>;

    /// Stored results for one requester in one domain, most recent first.
    async fn recent(
        &self,
        farmer_id: &str,
        domain: Domain,
    ) -> Result<Vec<AnalysisResult>, PipelineError>;
}

/// In-process store used by tests and offline runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<AnalysisResult>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn append(&self, record: &AnalysisRecord) -> Result<String, PipelineError> {
        let id = Uuid::new_v4().to_string();
        let row = AnalysisResult {
            id: id.clone(),
            farmer_id: record.farmer_id.clone(),
            domain: record.domain,
            request: record.request.clone(),
            analysis: record.analysis.clone(),
            extracted: record.extracted.clone(),
            created_at: Utc::now(),
        };
        let mut rows = self.rows.lock().map_err(|_| PipelineError::Persistence {
            message: "result store lock poisoned".to_string(),
        })?;
        rows.push(row);
        Ok(id)
    }

    async fn recent(
        &self,
        farmer_id: &str,
        domain: Domain,
    ) -> Result<Vec<AnalysisResult>, PipelineError> {
        let rows = self.rows.lock().map_err(|_| PipelineError::Persistence {
            message: "result store lock poisoned".to_string(),
        })?;
        let mut matching: Vec<_> = rows
            .iter()
            .filter(|row| row.farmer_id == farmer_id && row.domain == domain)
            .cloned()
            .collect();
        // Newest insertion first on timestamp ties, hence the reverse before
        // the stable sort.
        matching.reverse();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}
