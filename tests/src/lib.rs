//! Shared fixtures for the AOMA end-to-end tests.

use aoma_core::SourceDocument;
use aoma_steps::{all_steps, sample_payload};
use aoma_test_utils::implementations::sample_sources;
use aoma_test_utils::ScriptedReasoningService;
use std::path::{Path, PathBuf};

/// Scripted service answering every ADAS step with its sample output
pub fn sample_scripted() -> ScriptedReasoningService {
    all_steps().iter().fold(ScriptedReasoningService::new(), |service, step| {
        match sample_payload(step.id.as_str()) {
            Some(payload) => service.respond(step.id.as_str(), payload),
            None => service,
        }
    })
}

/// The sample documents plus two the standard source policy rejects
pub fn mixed_sources() -> Vec<SourceDocument> {
    let mut documents = sample_sources();
    documents.push(SourceDocument::new(
        "https://medium.com/@someone/adas-chips-explained",
        "Opinion piece on ADAS chips.",
    ));
    documents.push(SourceDocument::new(
        "https://www.example.org/adas",
        "Unvetted aggregator page.",
    ));
    documents
}

/// Write documents as a sources file and return its path
pub async fn write_sources_file(dir: &Path, documents: &[SourceDocument]) -> std::io::Result<PathBuf> {
    let path = dir.join("sources.json");
    let content = serde_json::to_vec_pretty(documents)?;
    tokio::fs::write(&path, content).await?;
    Ok(path)
}
