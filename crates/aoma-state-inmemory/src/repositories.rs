use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use async_trait::async_trait;

use aoma_core::{CoreError, Run, RunId, RunRepository, RunSummary};

/// In-memory implementation of the RunRepository
#[derive(Clone, Default)]
pub struct InMemoryRunRepository {
    runs: Arc<RwLock<HashMap<RunId, Run>>>,
}

impl InMemoryRunRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored runs
    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    /// Whether no run is stored
    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn save(&self, run: &Run) -> Result<(), CoreError> {
        let mut runs = self.runs.write().await;
        debug!(run_id = %run.run_id, status = %run.status, "Saving run");
        runs.insert(run.run_id.clone(), run.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &RunId) -> Result<Option<Run>, CoreError> {
        let runs = self.runs.read().await;
        Ok(runs.get(id).cloned())
    }

    async fn list_runs(&self) -> Result<Vec<RunSummary>, CoreError> {
        let runs = self.runs.read().await;
        let mut summaries: Vec<RunSummary> = runs.values().map(RunSummary::from).collect();
        summaries.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| a.run_id.cmp(&b.run_id)));
        Ok(summaries)
    }
}
