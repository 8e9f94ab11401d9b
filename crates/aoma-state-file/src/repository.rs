//! JSON-file implementation of the RunRepository.

use crate::layout::OutputLayout;
use aoma_core::{CoreError, Run, RunId, RunRepository, RunSummary};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, warn};

/// Stores each run as `runs/<run_id>.json` and each successful step as
/// `reports/<step_id>_result_<timestamp>.json`
#[derive(Debug, Clone)]
pub struct FileRunRepository {
    layout: OutputLayout,
}

impl FileRunRepository {
    /// Repository writing below the given outputs root
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            layout: OutputLayout::new(root),
        }
    }

    /// The directory layout
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Write the result of every successful step of the run
    pub async fn write_step_reports(&self, run: &Run) -> Result<usize, CoreError> {
        tokio::fs::create_dir_all(self.layout.reports_dir()).await?;
        let at = run.finished_at.unwrap_or(run.started_at);

        let mut written = 0;
        for (step_id, result) in run.completed_steps.snapshot() {
            if !result.is_ok() {
                continue;
            }
            let path = self.layout.step_report_file(step_id.as_str(), at);
            write_json(&path, &result).await?;
            debug!(step_id = %step_id, path = %path.display(), "Step result written");
            written += 1;
        }
        Ok(written)
    }

    async fn read_run(path: &Path) -> Result<Run, CoreError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Write JSON through a temporary file so readers never see a partial record
async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    let content = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl RunRepository for FileRunRepository {
    async fn save(&self, run: &Run) -> Result<(), CoreError> {
        self.layout
            .ensure()
            .await
            .map_err(|e| CoreError::StateStoreError(format!("Failed to create {}: {}", self.layout.root().display(), e)))?;

        write_json(&self.layout.run_file(&run.run_id.0), run).await?;
        if run.status.is_terminal() {
            self.write_step_reports(run).await?;
        }
        debug!(run_id = %run.run_id, status = %run.status, "Run saved");
        Ok(())
    }

    async fn find_by_id(&self, id: &RunId) -> Result<Option<Run>, CoreError> {
        let path = self.layout.run_file(&id.0);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        Self::read_run(&path).await.map(Some)
    }

    async fn list_runs(&self) -> Result<Vec<RunSummary>, CoreError> {
        let dir = self.layout.runs_dir();
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_run(&path).await {
                Ok(run) => summaries.push(RunSummary::from(&run)),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable run record"),
            }
        }

        summaries.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| a.run_id.cmp(&b.run_id)));
        Ok(summaries)
    }
}
