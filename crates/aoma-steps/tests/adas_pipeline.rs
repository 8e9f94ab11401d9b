use aoma_core::{ExecutionMode, ReasoningService, Run, RunOrchestrator, RunStatus, SourceDocument, StepExecutor, StepId};
use aoma_steps::steps::{
    competitive_landscape, gap_analysis, market_size, pain_point_extraction, positioning_messaging, source_discovery,
    visualization_reporting,
};
use aoma_steps::{adas_registry, sample_payload, PolicyFilteredSources, SampleReasoningService, SourcePolicy};
use aoma_test_utils::assertions::{assert_run_status, assert_step_failed, assert_step_ok, assert_step_skipped};
use aoma_test_utils::{fast_retry_policy, RecordingRenderer, ScriptedReasoningService, StaticSourceProvider};
use pretty_assertions::assert_eq;
use std::sync::Arc;

/// Scripted service answering every step with its sample payload
fn sample_scripted() -> ScriptedReasoningService {
    aoma_steps::all_steps().iter().fold(ScriptedReasoningService::new(), |service, step| {
        let id = step.id.as_str();
        match sample_payload(id) {
            Some(payload) => service.respond(id, payload),
            None => service,
        }
    })
}

fn orchestrator(reasoning: Arc<dyn ReasoningService>) -> RunOrchestrator {
    let executor = StepExecutor::new(reasoning).with_retry_policy(fast_retry_policy(1));
    RunOrchestrator::new(Arc::new(adas_registry().unwrap()), executor).unwrap()
}

#[tokio::test]
async fn sample_run_succeeds_without_warnings() {
    let renderer = Arc::new(RecordingRenderer::new());
    let run = orchestrator(Arc::new(SampleReasoningService::new()))
        .with_renderer(renderer.clone())
        .start_run()
        .await
        .unwrap();

    assert_run_status(&run, RunStatus::Succeeded).unwrap();
    for (id, result) in run.completed_steps.snapshot() {
        assert_eq!(result.attempt_count, 1, "{}", id);
        assert!(result.validation_warnings.is_empty(), "{}: {:?}", id, result.validation_warnings);
    }
    assert_eq!(renderer.last().unwrap().completed_steps.len(), 10);
}

#[tokio::test(start_paused = true)]
async fn pain_point_failure_spares_the_competitive_branch() {
    let reasoning = Arc::new(sample_scripted().fail_permanently(pain_point_extraction::ID));

    let run = orchestrator(reasoning.clone()).start_run().await.unwrap();

    assert_run_status(&run, RunStatus::PartiallyFailed).unwrap();
    assert_step_ok(&run, market_size::ID, 1).unwrap();
    assert_step_ok(&run, competitive_landscape::ID, 1).unwrap();
    assert_step_failed(&run, pain_point_extraction::ID, None).unwrap();
    for id in ["compute_architecture", "bottleneck_diagnosis", gap_analysis::ID, positioning_messaging::ID, visualization_reporting::ID] {
        assert_step_skipped(&run, id).unwrap();
        assert_eq!(reasoning.invocations_for(id), 0);
    }
}

#[tokio::test]
async fn acceptance_warnings_are_attached_not_fatal() {
    let reasoning = sample_scripted().respond(
        market_size::ID,
        serde_json::json!({
            "current_market_size_usd_millions": 4200,
            "base_year": 2024,
            "projected_market_size_usd_millions": 9800,
            "projection_year": 2030,
            "cagr_percent": 15.2,
            "sources": [{"name": "only one"}],
            "confidence": "Low"
        }),
    );

    let run = orchestrator(Arc::new(reasoning)).start_run().await.unwrap();

    assert_run_status(&run, RunStatus::Succeeded).unwrap();
    let result = run.completed_steps.get(&StepId::new(market_size::ID)).unwrap();
    assert_eq!(result.validation_warnings, vec!["Only 1 sources (need ≥3)".to_string()]);
}

#[tokio::test]
async fn graph_parallel_sample_run_matches_sequential() {
    let sequential = orchestrator(Arc::new(SampleReasoningService::new())).start_run().await.unwrap();
    let parallel = orchestrator(Arc::new(SampleReasoningService::new()))
        .with_mode(ExecutionMode::GraphParallel)
        .start_run()
        .await
        .unwrap();

    assert_eq!(sequential.status, parallel.status);
    let payloads = |run: &Run| {
        run.completed_steps
            .snapshot()
            .into_iter()
            .map(|(id, r)| (id, r.payload))
            .collect::<Vec<_>>()
    };
    assert_eq!(payloads(&sequential), payloads(&parallel));
}

#[tokio::test]
async fn screened_sources_reach_source_discovery_only() {
    let provider = StaticSourceProvider::new(vec![
        SourceDocument::new("https://www.sae.org/standards/j3016", "Taxonomy of driving automation"),
        SourceDocument::new("https://someone.medium.com/adas", "Opinion"),
    ]);
    let sources = PolicyFilteredSources::new(Arc::new(provider), SourcePolicy::standard().unwrap());
    let reasoning = Arc::new(sample_scripted());

    let run = orchestrator(reasoning.clone())
        .with_sources(Arc::new(sources))
        .start_run()
        .await
        .unwrap();

    assert_eq!(run.source_documents.len(), 1);
    let requests = reasoning.requests();
    let discovery = requests
        .iter()
        .find(|r| r.step_id.as_str() == source_discovery::ID)
        .unwrap();
    assert!(discovery.prompt.contains("j3016"));
    assert!(!discovery.prompt.contains("medium.com"));
    let market = requests.iter().find(|r| r.step_id.as_str() == market_size::ID).unwrap();
    assert!(market.context.get("sources").is_none());
}
