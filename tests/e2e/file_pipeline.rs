use aoma_core::{RunOrchestrator, RunRepository, RunStatus, StepExecutor};
use aoma_monitoring::metrics::names;
use aoma_monitoring::{InMemoryMetricsCollector, PipelineMetrics};
use aoma_report::MarkdownReportRenderer;
use aoma_state_file::FileRunRepository;
use aoma_steps::steps::{competitive_landscape, compute_architecture, source_discovery};
use aoma_steps::{adas_registry, FileSourceProvider, PolicyFilteredSources, SourcePolicy};
use aoma_test_utils::assertions::{assert_run_status, assert_step_failed, assert_step_ok, assert_step_skipped};
use aoma_test_utils::fast_retry_policy;
use aoma_tests::{mixed_sources, sample_scripted, write_sources_file};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn partial_failure_flows_through_store_report_and_metrics() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let sources_file = write_sources_file(dir.path(), &mixed_sources()).await?;
    let outputs = dir.path().join("outputs");

    let reasoning = Arc::new(
        sample_scripted()
            .fail_transiently(competitive_landscape::ID, 2)
            .fail_permanently(compute_architecture::ID),
    );
    let repository = Arc::new(FileRunRepository::new(&outputs));
    let renderer = Arc::new(MarkdownReportRenderer::new(&outputs));
    let collector = InMemoryMetricsCollector::new();
    let sources = PolicyFilteredSources::new(Arc::new(FileSourceProvider::new(&sources_file)), SourcePolicy::standard()?);

    let orchestrator = RunOrchestrator::new(
        Arc::new(adas_registry()?),
        StepExecutor::new(reasoning.clone()).with_retry_policy(fast_retry_policy(2)),
    )?
    .with_sources(Arc::new(sources))
    .with_repository(repository.clone())
    .with_renderer(renderer.clone())
    .with_event_handler(Arc::new(PipelineMetrics::new(Arc::new(collector.clone()))));

    let run = orchestrator.start_run().await?;

    // Outcome
    assert_run_status(&run, RunStatus::PartiallyFailed)?;
    assert_step_ok(&run, competitive_landscape::ID, 3)?;
    assert_step_failed(&run, compute_architecture::ID, None)?;
    for id in ["bottleneck_diagnosis", "gap_analysis", "positioning_messaging", "visualization_reporting"] {
        assert_step_skipped(&run, id)?;
        assert_eq!(reasoning.invocations_for(id), 0);
    }

    // Only policy-approved documents reach the run and the source step's prompt
    assert_eq!(run.source_documents.len(), 3);
    let requests = reasoning.requests();
    let prompt = &requests.iter().find(|r| r.step_id.as_str() == source_discovery::ID).unwrap().prompt;
    assert!(prompt.contains("ieeexplore.ieee.org"));
    assert!(!prompt.contains("medium.com"));

    // Persistence
    let stored = repository.find_by_id(&run.run_id).await?.unwrap();
    assert_eq!(stored.completed_steps, run.completed_steps);
    assert_eq!(repository.latest().await?.unwrap().run_id, run.run_id);

    // Report
    let markdown = tokio::fs::read_to_string(renderer.last_written().unwrap()).await?;
    assert!(markdown.contains("| Steps ok | 5 / 10 |"));
    assert!(markdown.contains("## 6. Compute & Architecture\n\n_data unavailable_ (Permanent service error: compute_architecture rejected)"));
    assert!(markdown.contains("| Source documents | 3 |"));

    // Metrics
    assert_eq!(collector.sum(names::STEPS_TOTAL, Some(("status", "ok"))), 5.0);
    assert_eq!(collector.sum(names::STEPS_SKIPPED, None), 4.0);
    assert_eq!(collector.sum(names::STEP_ATTEMPTS, Some(("step_id", competitive_landscape::ID))), 3.0);
    Ok(())
}

#[tokio::test]
async fn missing_sources_file_degrades_to_an_empty_source_list() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let reasoning = Arc::new(sample_scripted());
    let sources = PolicyFilteredSources::new(
        Arc::new(FileSourceProvider::new(dir.path().join("missing.json"))),
        SourcePolicy::standard()?,
    );

    let run = RunOrchestrator::new(Arc::new(adas_registry()?), StepExecutor::new(reasoning.clone()))?
        .with_sources(Arc::new(sources))
        .start_run()
        .await?;

    assert!(run.source_documents.is_empty());
    assert_run_status(&run, RunStatus::Succeeded)?;
    Ok(())
}
