//! Wiring of the pipeline for the command-line entry points.

use crate::cli::RunArgs;
use crate::config::PipelineConfig;
use aoma_core::{
    CancellationHandle, CoreError, ExecutionMode, ReasoningService, ReportRenderer, Run, RunId, RunOrchestrator,
    RunReport, RunRepository, RunSummary, SourceProvider, StepExecutor, StepId, StepRegistry,
};
use aoma_monitoring::{PipelineMetrics, TracingMetricsCollector};
use aoma_reasoning::AnthropicReasoningService;
use aoma_report::MarkdownReportRenderer;
use aoma_state_file::{ArchiveInfo, ArchiveManager, FileRunRepository};
use aoma_steps::{adas_registry, FileSourceProvider, PolicyFilteredSources, SampleReasoningService, SourcePolicy};
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a full run
#[derive(Debug)]
pub struct RunOutcome {
    /// The finished run
    pub run: Run,
    /// Rendered report, if rendering succeeded
    pub report_path: Option<PathBuf>,
    /// Archive the previous outputs were moved to
    pub archived: Option<PathBuf>,
}

impl RunOutcome {
    /// Human-readable summary
    pub fn summary(&self) -> String {
        let results = self.run.completed_steps.snapshot();
        let ok = results.values().filter(|r| r.is_ok()).count();
        let duration = self
            .run
            .finished_at
            .map(|at| (at - self.run.started_at).num_milliseconds() as f64 / 1000.0)
            .unwrap_or_default();

        let mut out = String::new();
        let _ = writeln!(out, "Run {} {}", self.run.run_id, self.run.status);
        let _ = writeln!(out, "  duration: {:.1}s", duration);
        let _ = writeln!(out, "  steps:    {} ok, {} failed (of {})", ok, results.len() - ok, results.len());
        for (id, result) in results.iter().filter(|(_, r)| !r.is_ok()) {
            let _ = writeln!(out, "    - {}: {}", id, result.error.as_deref().unwrap_or("unknown error"));
        }
        if self.run.cancelled {
            let _ = writeln!(out, "  cancelled before every step executed");
        }
        if let Some(path) = &self.report_path {
            let _ = writeln!(out, "  report:   {}", path.display());
        }
        if let Some(path) = &self.archived {
            let _ = writeln!(out, "  archived: {}", path.display());
        }
        out
    }
}

/// The assembled application
pub struct App {
    config: PipelineConfig,
    registry: Arc<StepRegistry>,
    repository: Arc<FileRunRepository>,
    offline: bool,
}

impl App {
    /// Build the application from its configuration
    pub fn new(config: PipelineConfig, offline: bool) -> Result<Self, CoreError> {
        let registry = Arc::new(adas_registry()?);
        let repository = Arc::new(FileRunRepository::new(&config.outputs_dir));
        Ok(Self {
            config,
            registry,
            repository,
            offline,
        })
    }

    /// The configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn reasoning(&self) -> Result<Arc<dyn ReasoningService>, CoreError> {
        if self.offline {
            info!("Offline mode, answering steps from sample outputs");
            return Ok(Arc::new(SampleReasoningService::new()));
        }

        let config = self.config.anthropic_config().ok_or_else(|| {
            CoreError::ConfigurationError("ANTHROPIC_API_KEY is not set. Set it or pass --offline.".to_string())
        })?;
        Ok(Arc::new(AnthropicReasoningService::new(config)?))
    }

    fn sources(&self) -> Result<Option<Arc<dyn SourceProvider>>, CoreError> {
        let Some(path) = &self.config.sources_file else {
            return Ok(None);
        };
        let provider = PolicyFilteredSources::new(Arc::new(FileSourceProvider::new(path)), SourcePolicy::standard()?);
        Ok(Some(Arc::new(provider)))
    }

    fn orchestrator(&self, mode: ExecutionMode) -> Result<RunOrchestrator, CoreError> {
        let executor = StepExecutor::new(self.reasoning()?)
            .with_retry_policy(self.config.retry_policy())
            .with_call_timeout(self.config.call_timeout());

        let mut orchestrator = RunOrchestrator::new(self.registry.clone(), executor)?
            .with_mode(mode)
            .with_repository(self.repository.clone())
            .with_event_handler(Arc::new(PipelineMetrics::new(Arc::new(TracingMetricsCollector))));
        if let Some(sources) = self.sources()? {
            orchestrator = orchestrator.with_sources(sources);
        }
        Ok(orchestrator)
    }

    /// Archive the previous outputs, then run every step and render the report
    pub async fn run(&self, args: &RunArgs, cancellation: CancellationHandle) -> Result<RunOutcome, CoreError> {
        let renderer = Arc::new(MarkdownReportRenderer::new(&self.config.outputs_dir));
        let mode = args.mode.unwrap_or(self.config.execution_mode);
        let orchestrator = self.orchestrator(mode)?.with_renderer(renderer.clone());

        let archived = if args.no_archive {
            None
        } else {
            self.archive_previous(args.keep_archives.unwrap_or(self.config.keep_archives))
                .await
        };

        let run = orchestrator.start_run_with(cancellation).await?;

        Ok(RunOutcome {
            run,
            report_path: renderer.last_written(),
            archived,
        })
    }

    async fn archive_previous(&self, keep: usize) -> Option<PathBuf> {
        let manager = ArchiveManager::new(&self.config.outputs_dir);
        let archived = match manager.archive_previous_run(None).await {
            Ok(archived) => archived,
            Err(e) => {
                warn!(error = %e, "Failed to archive previous outputs");
                return None;
            }
        };
        if let Err(e) = manager.clean_old_archives(keep).await {
            warn!(error = %e, "Failed to clean old archives");
        }
        archived
    }

    /// Run one step and its transitive dependencies
    pub async fn run_step(&self, step_id: &str, cancellation: CancellationHandle) -> Result<Run, CoreError> {
        self.orchestrator(self.config.execution_mode)?
            .start_run_for_with(&StepId::new(step_id), cancellation)
            .await
    }

    /// Execution order with dependencies, one step per line
    pub fn describe_steps(&self) -> Result<String, CoreError> {
        let order = self.registry.validate()?;
        let mut out = String::new();
        for (index, id) in order.iter().enumerate() {
            let step = self
                .registry
                .get(id)
                .ok_or_else(|| CoreError::StepNotFound(id.0.clone()))?;
            let deps: Vec<&str> = step.depends_on.iter().map(StepId::as_str).collect();
            let _ = write!(out, "{:>2}. {:<24} {}", index + 1, id.as_str(), step.name);
            if !deps.is_empty() {
                let _ = write!(out, " <- {}", deps.join(", "));
            }
            out.push('\n');
        }
        Ok(out)
    }

    /// Persisted runs, newest first
    pub async fn list_runs(&self) -> Result<Vec<RunSummary>, CoreError> {
        self.repository.list_runs().await
    }

    /// Render a persisted run again
    pub async fn render(&self, run_id: &str) -> Result<Option<PathBuf>, CoreError> {
        let run = self
            .repository
            .find_by_id(&RunId(run_id.to_string()))
            .await?
            .ok_or_else(|| CoreError::RunNotFound(run_id.to_string()))?;

        let order = self.registry.validate()?;
        let steps = order
            .iter()
            .filter(|id| run.completed_steps.contains(id))
            .filter_map(|id| self.registry.get(id));
        let report = RunReport::new(&run, steps);

        let renderer = MarkdownReportRenderer::new(&self.config.outputs_dir);
        renderer.render(&report).await?;
        Ok(renderer.last_written())
    }

    /// Archived outputs, oldest first
    pub async fn archives(&self) -> Result<Vec<ArchiveInfo>, CoreError> {
        let manager = ArchiveManager::new(&self.config.outputs_dir);
        let mut infos = Vec::new();
        for name in manager.list_archives().await? {
            if let Some(info) = manager.archive_info(&name).await? {
                infos.push(info);
            }
        }
        Ok(infos)
    }
}
