use crate::implementations::{RecordingRenderer, ScriptedReasoningService, StaticSourceProvider};
use aoma_core::{
    CoreError, ExecutionMode, PromptContract, RetryPolicy, RunOrchestrator, RunRepository, SourceDocument,
    StepDefinition, StepExecutor, StepRegistry,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// A step whose prompt is its context and whose output must be an object.
pub fn step(id: &str, depends_on: &[&str]) -> StepDefinition {
    StepDefinition::new(id, PromptContract::new("{context}").with_output_schema(json!({ "type": "object" })))
        .depends_on(depends_on.iter().copied())
}

/// `A`, `B(A)`, `C(A)`, `D(B, C)`
pub fn diamond_steps() -> Vec<StepDefinition> {
    vec![step("A", &[]), step("B", &["A"]), step("C", &["A"]), step("D", &["B", "C"])]
}

/// Retry policy with millisecond delays, for paused-clock tests.
pub fn fast_retry_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        max_delay: Duration::from_millis(20),
        jitter_factor: 0.0,
    }
}

/// Everything a scenario test needs to drive and inspect a run.
pub struct TestPipeline {
    /// The orchestrator under test
    pub orchestrator: RunOrchestrator,

    /// The scripted reasoning service
    pub reasoning: Arc<ScriptedReasoningService>,

    /// The renderer that recorded the finished runs
    pub renderer: RecordingRenderer,

    /// The source provider
    pub sources: Arc<StaticSourceProvider>,
}

/// Builder for [`TestPipeline`].
pub struct TestPipelineBuilder {
    steps: Vec<StepDefinition>,
    reasoning: ScriptedReasoningService,
    retry_policy: RetryPolicy,
    call_timeout: Duration,
    mode: ExecutionMode,
    documents: Vec<SourceDocument>,
    renderer: RecordingRenderer,
    repository: Option<Arc<dyn RunRepository>>,
}

impl TestPipelineBuilder {
    /// Starts a builder for the given steps.
    pub fn new(steps: Vec<StepDefinition>) -> Self {
        Self {
            steps,
            reasoning: ScriptedReasoningService::new(),
            retry_policy: fast_retry_policy(2),
            call_timeout: Duration::from_secs(30),
            mode: ExecutionMode::Sequential,
            documents: Vec::new(),
            renderer: RecordingRenderer::new(),
            repository: None,
        }
    }

    /// Uses the given scripted service.
    pub fn reasoning(mut self, reasoning: ScriptedReasoningService) -> Self {
        self.reasoning = reasoning;
        self
    }

    /// Uses the given retry policy.
    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Uses the given per-call timeout.
    pub fn call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Uses the given execution mode.
    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Seeds the run with source documents.
    pub fn sources(mut self, documents: Vec<SourceDocument>) -> Self {
        self.documents = documents;
        self
    }

    /// Uses the given renderer.
    pub fn renderer(mut self, renderer: RecordingRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Persists finished runs into the given repository.
    pub fn repository(mut self, repository: Arc<dyn RunRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Builds the pipeline, failing on definition errors.
    pub fn build(self) -> Result<TestPipeline, CoreError> {
        let registry = Arc::new(StepRegistry::from_steps(self.steps)?);
        let reasoning = Arc::new(self.reasoning);
        let sources = Arc::new(StaticSourceProvider::new(self.documents));

        let executor = StepExecutor::new(reasoning.clone())
            .with_retry_policy(self.retry_policy)
            .with_call_timeout(self.call_timeout);

        let mut orchestrator = RunOrchestrator::new(registry, executor)?
            .with_mode(self.mode)
            .with_sources(sources.clone())
            .with_renderer(Arc::new(self.renderer.clone()));
        if let Some(repository) = self.repository {
            orchestrator = orchestrator.with_repository(repository);
        }

        Ok(TestPipeline {
            orchestrator,
            reasoning,
            renderer: self.renderer,
            sources,
        })
    }
}
