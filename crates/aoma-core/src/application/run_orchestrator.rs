use crate::application::context_assembler::build_context;
use crate::application::step_executor::StepExecutor;
use crate::domain::collaborators::{ReportRenderer, RunReport, SourceDocument, SourceProvider};
use crate::domain::context::StepContext;
use crate::domain::dependency_graph::{DependencyGraph, ExecutionOrder};
use crate::domain::events::{LoggingEventHandler, RunEventHandler, StepCommitted, StepSkipped};
use crate::domain::repository::RunRepository;
use crate::domain::run::{Run, RunStatus, StepResult};
use crate::domain::step_definition::{StepDefinition, StepId, StepRegistry};
use crate::CoreError;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How independent steps are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One step at a time, in execution order
    #[default]
    Sequential,

    /// A step starts as soon as its last dependency commits
    GraphParallel,
}

impl FromStr for ExecutionMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "graph_parallel" | "graph-parallel" | "parallel" => Ok(ExecutionMode::GraphParallel),
            other => Err(CoreError::ConfigurationError(format!(
                "Unknown execution mode: {} (expected sequential or graph_parallel)",
                other
            ))),
        }
    }
}

/// Flag used to abort a single run between steps
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle(Arc<AtomicBool>);

impl CancellationHandle {
    /// Create an unset handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect before the next step starts.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives a run from creation to a terminal status
pub struct RunOrchestrator {
    registry: Arc<StepRegistry>,
    order: ExecutionOrder,
    graph: DependencyGraph,
    executor: StepExecutor,
    sources: Option<Arc<dyn SourceProvider>>,
    renderer: Option<Arc<dyn ReportRenderer>>,
    repository: Option<Arc<dyn RunRepository>>,
    event_handler: Arc<dyn RunEventHandler>,
    mode: ExecutionMode,
}

impl RunOrchestrator {
    /// Create an orchestrator.
    ///
    /// Fails if the registry's dependency relation is invalid, so definition
    /// errors surface before any run starts.
    pub fn new(registry: Arc<StepRegistry>, executor: StepExecutor) -> Result<Self, CoreError> {
        let order = registry.validate()?;
        let graph = DependencyGraph::from_steps(registry.all_steps());

        Ok(Self {
            registry,
            order,
            graph,
            executor,
            sources: None,
            renderer: None,
            repository: None,
            event_handler: Arc::new(LoggingEventHandler),
            mode: ExecutionMode::default(),
        })
    }

    /// Set the source provider
    pub fn with_sources(mut self, sources: Arc<dyn SourceProvider>) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Set the renderer
    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Set the run repository
    pub fn with_repository(mut self, repository: Arc<dyn RunRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Set the event handler
    pub fn with_event_handler(mut self, event_handler: Arc<dyn RunEventHandler>) -> Self {
        self.event_handler = event_handler;
        self
    }

    /// Set the execution mode
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// The full execution order
    pub fn execution_order(&self) -> &ExecutionOrder {
        &self.order
    }

    /// The step registry
    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Execute every registered step
    pub async fn start_run(&self) -> Result<Run, CoreError> {
        self.start_run_with(CancellationHandle::new()).await
    }

    /// Execute every registered step, stopping between steps once `cancellation` is set.
    ///
    /// The handle only affects this run.
    pub async fn start_run_with(&self, cancellation: CancellationHandle) -> Result<Run, CoreError> {
        let order = self.registry.validate()?;
        self.execute(order, &cancellation).await
    }

    /// Execute one step together with everything it transitively depends on
    pub async fn start_run_for(&self, target: &StepId) -> Result<Run, CoreError> {
        self.start_run_for_with(target, CancellationHandle::new()).await
    }

    /// [`start_run_for`](Self::start_run_for) with a cancellation handle for this run
    pub async fn start_run_for_with(&self, target: &StepId, cancellation: CancellationHandle) -> Result<Run, CoreError> {
        if !self.registry.contains(target) {
            return Err(CoreError::StepNotFound(target.0.clone()));
        }

        let mut needed = HashSet::new();
        let mut stack = vec![target];
        while let Some(id) = stack.pop() {
            if needed.insert(id.clone()) {
                if let Some(step) = self.registry.get(id) {
                    stack.extend(step.depends_on.iter());
                }
            }
        }

        let order = self.registry.validate()?;
        let subset = ExecutionOrder(order.into_iter().filter(|id| needed.contains(id)).collect());
        self.execute(subset, &cancellation).await
    }

    /// Build a report for a run using this orchestrator's step metadata
    pub fn report_for(&self, run: &Run) -> RunReport {
        let steps: Vec<&StepDefinition> = self
            .order
            .iter()
            .filter(|id| run.completed_steps.contains(id))
            .filter_map(|id| self.registry.get(id))
            .collect();
        RunReport::new(run, steps)
    }

    async fn execute(&self, order: ExecutionOrder, cancellation: &CancellationHandle) -> Result<Run, CoreError> {
        let documents = self.fetch_sources().await;
        let mut run = Run::new(documents);
        self.handle_events(&mut run).await;

        info!(
            run_id = %run.run_id,
            steps = order.len(),
            mode = ?self.mode,
            "Starting run"
        );

        run.start()?;
        self.handle_events(&mut run).await;

        match self.mode {
            ExecutionMode::Sequential => self.execute_sequential(&mut run, &order, cancellation).await?,
            ExecutionMode::GraphParallel => self.execute_graph_parallel(&mut run, &order, cancellation).await?,
        }

        let status = run.finalize(order.iter())?;
        self.handle_events(&mut run).await;

        let elapsed_ms = (Utc::now() - run.started_at).num_milliseconds();
        match status {
            RunStatus::Succeeded => info!(run_id = %run.run_id, %status, elapsed_ms, "Run finished"),
            _ => warn!(run_id = %run.run_id, %status, elapsed_ms, "Run finished with failures"),
        }

        if let Some(repository) = &self.repository {
            if let Err(e) = repository.save(&run).await {
                error!(run_id = %run.run_id, error = %e, "Failed to persist run");
            }
        }

        if let Some(renderer) = &self.renderer {
            let report = self.report_for(&run);
            if let Err(e) = renderer.render(&report).await {
                error!(run_id = %run.run_id, error = %e, "Failed to render report");
            }
        }

        Ok(run)
    }

    async fn fetch_sources(&self) -> Vec<SourceDocument> {
        let Some(provider) = &self.sources else {
            return Vec::new();
        };

        match provider.fetch().await {
            Ok(documents) => {
                debug!(count = documents.len(), "Fetched source documents");
                documents
            }
            Err(e) => {
                warn!(error = %e, "Source provider failed, continuing without sources");
                Vec::new()
            }
        }
    }

    async fn execute_sequential(
        &self,
        run: &mut Run,
        order: &ExecutionOrder,
        cancellation: &CancellationHandle,
    ) -> Result<(), CoreError> {
        for (position, id) in order.iter().enumerate() {
            if cancellation.is_cancelled() {
                self.cancel_remaining(run, &order.0[position..])?;
                break;
            }

            let step = self.step(id)?;
            if self.upstream_failed(step, run) {
                self.skip(run, step)?;
                continue;
            }

            let context = build_context(step, run)?;
            let result = self.executor.execute_and_commit(step, &context, run).await?;
            self.record_committed(run, &result);
            self.handle_events(run).await;
        }
        Ok(())
    }

    async fn execute_graph_parallel(
        &self,
        run: &mut Run,
        order: &ExecutionOrder,
        cancellation: &CancellationHandle,
    ) -> Result<(), CoreError> {
        let mut pending = order.iter().map(|id| self.step(id)).collect::<Result<Vec<_>, _>>()?;
        let mut in_flight = FuturesUnordered::new();
        let mut cancelled = false;

        loop {
            if !cancelled && cancellation.is_cancelled() {
                // In-flight calls finish, nothing new starts
                let ids: Vec<StepId> = pending.drain(..).map(|step| step.id.clone()).collect();
                self.cancel_remaining(run, &ids)?;
                cancelled = true;
            }

            // Pass in execution order: a skip is visible to later steps in the same pass
            let mut waiting = Vec::with_capacity(pending.len());
            for step in pending {
                if !step.depends_on.iter().all(|dep| run.completed_steps.contains(dep)) {
                    waiting.push(step);
                } else if self.upstream_failed(step, run) {
                    self.skip(run, step)?;
                } else {
                    debug!(run_id = %run.run_id, step_id = %step.id, in_flight = in_flight.len() + 1, "Starting step");
                    in_flight.push(self.launch(step, build_context(step, run)?));
                }
            }
            pending = waiting;
            self.handle_events(run).await;

            let Some(result) = in_flight.next().await else {
                break;
            };
            run.commit(result.clone())?;
            self.record_committed(run, &result);
            self.handle_events(run).await;
        }

        if let Some(step) = pending.first() {
            let dependency = step
                .depends_on
                .iter()
                .find(|dep| !run.completed_steps.contains(dep))
                .map(|dep| dep.0.clone())
                .unwrap_or_default();
            return Err(CoreError::MissingDependencyResult {
                step: step.id.0.clone(),
                dependency,
            });
        }
        Ok(())
    }

    fn launch<'a>(&'a self, step: &'a StepDefinition, context: StepContext) -> impl Future<Output = StepResult> + 'a {
        async move { self.executor.execute(step, &context).await }
    }

    fn step(&self, id: &StepId) -> Result<&StepDefinition, CoreError> {
        self.registry
            .get(id)
            .ok_or_else(|| CoreError::StepNotFound(id.0.clone()))
    }

    fn upstream_failed(&self, step: &StepDefinition, run: &Run) -> bool {
        step.depends_on
            .iter()
            .any(|dep| matches!(run.completed_steps.get(dep), Some(r) if !r.is_ok()))
    }

    fn skip(&self, run: &mut Run, step: &StepDefinition) -> Result<(), CoreError> {
        warn!(run_id = %run.run_id, step_id = %step.id, "Skipping step, upstream dependency failed");
        run.commit(StepResult::skipped(step.id.clone()))?;
        run.record_event(Box::new(StepSkipped {
            run_id: run.run_id.clone(),
            step_id: step.id.clone(),
            timestamp: Utc::now(),
        }));
        Ok(())
    }

    fn cancel_remaining(&self, run: &mut Run, ids: &[StepId]) -> Result<(), CoreError> {
        let mut pending = 0;
        for id in ids {
            if !run.completed_steps.contains(id) {
                run.commit(StepResult::cancelled(id.clone()))?;
                pending += 1;
            }
        }
        warn!(run_id = %run.run_id, pending, "Run cancelled");
        run.mark_cancelled(pending);
        Ok(())
    }

    fn record_committed(&self, run: &mut Run, result: &StepResult) {
        if !result.is_ok() {
            let dependents = self.graph.transitive_dependents(&result.step_id);
            if !dependents.is_empty() {
                warn!(
                    run_id = %run.run_id,
                    step_id = %result.step_id,
                    dependents = dependents.len(),
                    "Step failed, dependents will be skipped"
                );
            }
        }

        run.record_event(Box::new(StepCommitted {
            run_id: run.run_id.clone(),
            step_id: result.step_id.clone(),
            status: result.status,
            attempt_count: result.attempt_count,
            error: result.error.clone(),
            timestamp: result.timestamp,
        }));
    }

    async fn handle_events(&self, run: &mut Run) {
        for event in run.take_events() {
            self.event_handler.handle_event(event).await;
        }
    }
}

impl std::fmt::Debug for RunOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOrchestrator")
            .field("order", &self.order)
            .field("mode", &self.mode)
            .field("executor", &self.executor)
            .finish()
    }
}
