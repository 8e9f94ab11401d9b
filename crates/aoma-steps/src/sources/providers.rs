//! Source providers backed by files and the source policy.

use super::policy::SourcePolicy;
use aoma_core::{CoreError, SourceDocument, SourceProvider};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reads source documents from a JSON array on disk
#[derive(Debug, Clone)]
pub struct FileSourceProvider {
    path: PathBuf,
}

impl FileSourceProvider {
    /// Provider for the given file
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path the documents are read from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SourceProvider for FileSourceProvider {
    async fn fetch(&self) -> Result<Vec<SourceDocument>, CoreError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CoreError::SourceError(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        let documents: Vec<SourceDocument> = serde_json::from_str(&content)?;
        debug!(path = %self.path.display(), count = documents.len(), "Loaded source documents");
        Ok(documents)
    }
}

/// Drops documents the policy rejects
pub struct PolicyFilteredSources {
    inner: Arc<dyn SourceProvider>,
    policy: SourcePolicy,
}

impl PolicyFilteredSources {
    /// Wrap a provider
    pub fn new(inner: Arc<dyn SourceProvider>, policy: SourcePolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl SourceProvider for PolicyFilteredSources {
    async fn fetch(&self) -> Result<Vec<SourceDocument>, CoreError> {
        let documents = self.inner.fetch().await?;
        let total = documents.len();

        let kept: Vec<SourceDocument> = documents
            .into_iter()
            .filter(|doc| match self.policy.classify(&doc.source_reference) {
                Ok(classification) => {
                    debug!(
                        source = %doc.source_reference,
                        category = %classification.category,
                        name = %classification.source_name,
                        "Source accepted"
                    );
                    true
                }
                Err(reason) => {
                    warn!(source = %doc.source_reference, reason = %reason, "Source rejected");
                    false
                }
            })
            .collect();

        info!(accepted = kept.len(), rejected = total - kept.len(), "Source documents screened");
        Ok(kept)
    }
}
