//! Mock implementations of the AOMA collaborator interfaces.
//!
//! Generated with `mockall` for tests that need to assert on exact calls.
//! Prefer the fakes in [`crate::implementations`] for scenario tests.

use aoma_core::{
    CoreError, ReasoningRequest, ReasoningResponse, ReasoningService, ReportRenderer, Run, RunId,
    RunReport, RunRepository, RunSummary, ServiceError, SourceDocument, SourceProvider,
};
use async_trait::async_trait;
use mockall::mock;

mock! {
    pub ReasoningService {}

    #[async_trait]
    impl ReasoningService for ReasoningService {
        async fn invoke(&self, request: ReasoningRequest) -> Result<ReasoningResponse, ServiceError>;
    }
}

mock! {
    pub SourceProvider {}

    #[async_trait]
    impl SourceProvider for SourceProvider {
        async fn fetch(&self) -> Result<Vec<SourceDocument>, CoreError>;
    }
}

mock! {
    pub ReportRenderer {}

    #[async_trait]
    impl ReportRenderer for ReportRenderer {
        async fn render(&self, report: &RunReport) -> Result<(), CoreError>;
    }
}

mock! {
    pub RunRepository {}

    #[async_trait]
    impl RunRepository for RunRepository {
        async fn save(&self, run: &Run) -> Result<(), CoreError>;
        async fn find_by_id(&self, id: &RunId) -> Result<Option<Run>, CoreError>;
        async fn list_runs(&self) -> Result<Vec<RunSummary>, CoreError>;
        async fn latest(&self) -> Result<Option<Run>, CoreError>;
    }
}
