//! Repository traits for run persistence
//!
//! External crates implement these traits to provide different persistence
//! mechanisms (in-memory, JSON files).

use async_trait::async_trait;

use super::run::{Run, RunId, RunStatus};
use crate::CoreError;

/// Short listing entry for a persisted run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// The run
    pub run_id: RunId,

    /// Status at the time it was saved
    pub status: RunStatus,

    /// When it started
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Run> for RunSummary {
    fn from(run: &Run) -> Self {
        Self {
            run_id: run.run_id.clone(),
            status: run.status,
            started_at: run.started_at,
        }
    }
}

/// Repository for runs
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Save a run, replacing any earlier record with the same id
    async fn save(&self, run: &Run) -> Result<(), CoreError>;

    /// Find a run by ID
    async fn find_by_id(&self, id: &RunId) -> Result<Option<Run>, CoreError>;

    /// List persisted runs, newest first
    async fn list_runs(&self) -> Result<Vec<RunSummary>, CoreError>;

    /// The most recently started run
    async fn latest(&self) -> Result<Option<Run>, CoreError> {
        match self.list_runs().await?.into_iter().next() {
            Some(summary) => self.find_by_id(&summary.run_id).await,
            None => Ok(None),
        }
    }
}
