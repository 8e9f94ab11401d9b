//! Renderer writing the Markdown report next to the step results.

use crate::markdown::render_markdown;
use aoma_core::{CoreError, ReportRenderer, RunReport};
use aoma_state_file::OutputLayout;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes `reports/adas_report_<timestamp>.md` below the outputs root
#[derive(Debug)]
pub struct MarkdownReportRenderer {
    layout: OutputLayout,
    last_written: Mutex<Option<PathBuf>>,
}

impl MarkdownReportRenderer {
    /// Renderer writing below the given outputs root
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            layout: OutputLayout::new(root),
            last_written: Mutex::new(None),
        }
    }

    /// Path of the most recently written report
    pub fn last_written(&self) -> Option<PathBuf> {
        self.last_written.lock().clone()
    }
}

#[async_trait]
impl ReportRenderer for MarkdownReportRenderer {
    async fn render(&self, report: &RunReport) -> Result<(), CoreError> {
        let markdown = render_markdown(report);
        let path = self
            .layout
            .rendered_report_file(report.finished_at.unwrap_or(report.started_at));

        tokio::fs::create_dir_all(self.layout.reports_dir())
            .await
            .map_err(|e| CoreError::RenderError(format!("Failed to create {}: {}", self.layout.reports_dir().display(), e)))?;
        tokio::fs::write(&path, markdown)
            .await
            .map_err(|e| CoreError::RenderError(format!("Failed to write {}: {}", path.display(), e)))?;

        info!(run_id = %report.run_id, path = %path.display(), "Report written");
        *self.last_written.lock() = Some(path);
        Ok(())
    }
}
