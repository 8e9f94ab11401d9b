//! Source provider returning a fixed document list.

use aoma_core::{CoreError, SourceDocument, SourceProvider};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Source provider that returns the same documents on every fetch.
#[derive(Debug, Default)]
pub struct StaticSourceProvider {
    documents: Vec<SourceDocument>,
    fetches: Mutex<usize>,
}

impl StaticSourceProvider {
    /// Creates a provider returning the given documents.
    pub fn new(documents: Vec<SourceDocument>) -> Self {
        Self {
            documents,
            fetches: Mutex::new(0),
        }
    }

    /// A provider with a small set of ADAS-flavoured documents.
    pub fn sample() -> Self {
        Self::new(sample_sources())
    }

    /// Number of fetches made.
    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock()
    }
}

#[async_trait]
impl SourceProvider for StaticSourceProvider {
    async fn fetch(&self) -> Result<Vec<SourceDocument>, CoreError> {
        *self.fetches.lock() += 1;
        Ok(self.documents.clone())
    }
}

/// Three documents covering the academic, financial and industry categories.
pub fn sample_sources() -> Vec<SourceDocument> {
    vec![
        SourceDocument::new(
            "https://ieeexplore.ieee.org/document/adas-compute-survey",
            "Survey of centralized compute architectures for L2+ driver assistance.",
        ),
        SourceDocument::new(
            "https://www.sec.gov/Archives/edgar/data/mobileye-10k",
            "Mobileye reported EyeQ shipments growth driven by ADAS adoption.",
        ),
        SourceDocument::new(
            "https://www.mckinsey.com/industries/automotive/adas-outlook",
            "ADAS semiconductor content per vehicle expected to double by 2030.",
        ),
    ]
}
