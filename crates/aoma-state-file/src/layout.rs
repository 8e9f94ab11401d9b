//! Directory layout of the outputs folder.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Timestamp format used in file and archive names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Paths below the outputs root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Layout rooted at `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The outputs root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full run records
    pub fn runs_dir(&self) -> PathBuf {
        self.root.join("runs")
    }

    /// Per-step results and rendered reports of the latest run
    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    /// Archived outputs of earlier runs
    pub fn archives_dir(&self) -> PathBuf {
        self.root.join("archives")
    }

    /// Record of one run
    pub fn run_file(&self, run_id: &str) -> PathBuf {
        self.runs_dir().join(format!("{}.json", run_id))
    }

    /// Result file of one step
    pub fn step_report_file(&self, step_id: &str, at: DateTime<Utc>) -> PathBuf {
        self.reports_dir()
            .join(format!("{}_result_{}.json", step_id, timestamp(at)))
    }

    /// Rendered Markdown report of one run
    pub fn rendered_report_file(&self, at: DateTime<Utc>) -> PathBuf {
        self.reports_dir().join(format!("adas_report_{}.md", timestamp(at)))
    }

    /// Create every directory of the layout
    pub async fn ensure(&self) -> std::io::Result<()> {
        for dir in [self.runs_dir(), self.reports_dir(), self.archives_dir()] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}

/// Format a time for file names
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}
