//! Renderer that keeps every report it receives.

use aoma_core::{CoreError, ReportRenderer, RunReport};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

/// Thread-safe renderer fake for inspecting what the orchestrator handed over.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    reports: Arc<RwLock<Vec<RunReport>>>,
    fail_with: Option<String>,
}

impl RecordingRenderer {
    /// Creates an empty renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer that records the report and then fails.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            reports: Arc::default(),
            fail_with: Some(reason.into()),
        }
    }

    /// Every report received, oldest first.
    pub fn reports(&self) -> Vec<RunReport> {
        self.reports.read().clone()
    }

    /// The most recent report.
    pub fn last(&self) -> Option<RunReport> {
        self.reports.read().last().cloned()
    }

    /// Number of reports received.
    pub fn count(&self) -> usize {
        self.reports.read().len()
    }
}

#[async_trait]
impl ReportRenderer for RecordingRenderer {
    async fn render(&self, report: &RunReport) -> Result<(), CoreError> {
        self.reports.write().push(report.clone());
        match &self.fail_with {
            Some(reason) => Err(CoreError::RenderError(reason.clone())),
            None => Ok(()),
        }
    }
}
