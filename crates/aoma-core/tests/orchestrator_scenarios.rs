use aoma_core::{
    build_context, resolve_order, CoreError, ExecutionMode, Run, RunStatus, StepId, StepResult, StepStatus,
};
use aoma_test_utils::assertions::{
    assert_complete_result_set, assert_run_status, assert_step_failed, assert_step_ok, assert_step_skipped,
};
use aoma_test_utils::implementations::sample_sources;
use aoma_test_utils::mocks::MockRunRepository;
use aoma_test_utils::{
    diamond_steps, fast_retry_policy, init_test_tracing, step, RecordingRenderer, ScriptedOutcome,
    ScriptedReasoningService, TestPipelineBuilder,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const DIAMOND: [&str; 4] = ["A", "B", "C", "D"];

#[tokio::test(start_paused = true)]
async fn diamond_with_permanent_failure_is_partially_failed() {
    init_test_tracing();
    let pipeline = TestPipelineBuilder::new(diamond_steps())
        .reasoning(ScriptedReasoningService::new().fail_permanently("C"))
        .build()
        .unwrap();

    let run = pipeline.orchestrator.start_run().await.unwrap();

    assert_run_status(&run, RunStatus::PartiallyFailed).unwrap();
    assert_step_ok(&run, "A", 1).unwrap();
    assert_step_ok(&run, "B", 1).unwrap();
    assert_step_failed(&run, "C", None).unwrap();
    assert_step_skipped(&run, "D").unwrap();
    assert_complete_result_set(&run, &DIAMOND).unwrap();

    assert_eq!(pipeline.reasoning.invocations_for("C"), 1);
    assert_eq!(pipeline.reasoning.invocations_for("D"), 0);
}

#[tokio::test(start_paused = true)]
async fn all_steps_succeed_on_first_attempt() {
    let pipeline = TestPipelineBuilder::new(diamond_steps()).build().unwrap();

    let run = pipeline.orchestrator.start_run().await.unwrap();

    assert_run_status(&run, RunStatus::Succeeded).unwrap();
    for id in DIAMOND {
        assert_step_ok(&run, id, 1).unwrap();
    }
    assert_eq!(pipeline.reasoning.invoked_steps(), vec!["A", "B", "C", "D"]);
}

#[tokio::test(start_paused = true)]
async fn root_failure_after_retries_fails_the_whole_run() {
    let pipeline = TestPipelineBuilder::new(diamond_steps())
        .reasoning(ScriptedReasoningService::new().fail_transiently("A", 10))
        .retry_policy(fast_retry_policy(2))
        .build()
        .unwrap();

    let run = pipeline.orchestrator.start_run().await.unwrap();

    assert_run_status(&run, RunStatus::Failed).unwrap();
    let a = run.completed_steps.get(&StepId::new("A")).unwrap();
    assert_eq!(a.status, StepStatus::Failed);
    assert_eq!(a.attempt_count, 3);
    for id in ["B", "C", "D"] {
        assert_step_skipped(&run, id).unwrap();
    }
    assert_eq!(pipeline.reasoning.total_invocations(), 3);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_below_the_cap_are_recovered() {
    for failures in 0..=2u32 {
        let pipeline = TestPipelineBuilder::new(diamond_steps())
            .reasoning(ScriptedReasoningService::new().fail_transiently("B", failures as usize))
            .retry_policy(fast_retry_policy(2))
            .build()
            .unwrap();

        let run = pipeline.orchestrator.start_run().await.unwrap();

        assert_run_status(&run, RunStatus::Succeeded).unwrap();
        assert_step_ok(&run, "B", failures + 1).unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn timed_out_call_is_retried() {
    let pipeline = TestPipelineBuilder::new(vec![step("only", &[])])
        .reasoning(ScriptedReasoningService::new().script("only", [ScriptedOutcome::Hang]))
        .call_timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let run = pipeline.orchestrator.start_run().await.unwrap();

    assert_step_ok(&run, "only", 2).unwrap();
}

#[tokio::test(start_paused = true)]
async fn independent_branch_continues_after_failure() {
    let steps = vec![
        step("root", &[]),
        step("left", &["root"]),
        step("left_child", &["left"]),
        step("right", &["root"]),
        step("right_child", &["right"]),
    ];
    let pipeline = TestPipelineBuilder::new(steps)
        .reasoning(ScriptedReasoningService::new().fail_permanently("left"))
        .build()
        .unwrap();

    let run = pipeline.orchestrator.start_run().await.unwrap();

    assert_run_status(&run, RunStatus::PartiallyFailed).unwrap();
    assert_step_skipped(&run, "left_child").unwrap();
    assert_step_ok(&run, "right", 1).unwrap();
    assert_step_ok(&run, "right_child", 1).unwrap();
}

#[tokio::test(start_paused = true)]
async fn graph_parallel_mode_preserves_skip_semantics() {
    let pipeline = TestPipelineBuilder::new(diamond_steps())
        .reasoning(ScriptedReasoningService::new().fail_permanently("C"))
        .mode(ExecutionMode::GraphParallel)
        .build()
        .unwrap();

    let run = pipeline.orchestrator.start_run().await.unwrap();

    assert_run_status(&run, RunStatus::PartiallyFailed).unwrap();
    assert_step_skipped(&run, "D").unwrap();
    assert_eq!(pipeline.reasoning.invocations_for("D"), 0);
    assert_eq!(run.completed_steps.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn dependency_payloads_reach_the_prompt() {
    let pipeline = TestPipelineBuilder::new(diamond_steps())
        .reasoning(
            ScriptedReasoningService::new()
                .respond("B", json!({"b_value": 7}))
                .respond("C", json!({"c_value": 9})),
        )
        .build()
        .unwrap();

    pipeline.orchestrator.start_run().await.unwrap();

    let request = pipeline
        .reasoning
        .requests()
        .into_iter()
        .find(|r| r.step_id.as_str() == "D")
        .unwrap();
    assert_eq!(request.context, json!({"B": {"b_value": 7}, "C": {"c_value": 9}}));
    assert!(request.prompt.contains("\"b_value\": 7"));
}

#[tokio::test(start_paused = true)]
async fn renderer_receives_complete_result_set() {
    let pipeline = TestPipelineBuilder::new(diamond_steps())
        .reasoning(ScriptedReasoningService::new().fail_permanently("B"))
        .sources(sample_sources())
        .build()
        .unwrap();

    let run = pipeline.orchestrator.start_run().await.unwrap();

    let report = pipeline.renderer.last().unwrap();
    assert_eq!(pipeline.renderer.count(), 1);
    assert_eq!(report.run_id, run.run_id);
    assert_eq!(report.status, RunStatus::PartiallyFailed);
    assert_eq!(report.completed_steps.len(), 4);
    assert_eq!(
        report.step_order,
        DIAMOND.iter().map(|s| StepId::new(*s)).collect::<Vec<_>>()
    );
    assert_eq!(report.source_documents.len(), 3);
    assert_eq!(pipeline.sources.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn renderer_and_repository_errors_do_not_fail_the_run() {
    let mut repository = MockRunRepository::new();
    repository
        .expect_save()
        .times(1)
        .returning(|_| Err(CoreError::StateStoreError("disk full".to_string())));

    let pipeline = TestPipelineBuilder::new(diamond_steps())
        .renderer(RecordingRenderer::failing("template missing"))
        .repository(Arc::new(repository))
        .build()
        .unwrap();

    let run = pipeline.orchestrator.start_run().await.unwrap();

    assert_run_status(&run, RunStatus::Succeeded).unwrap();
    assert_eq!(pipeline.renderer.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn repository_receives_terminal_run() {
    let mut repository = MockRunRepository::new();
    repository
        .expect_save()
        .withf(|run: &Run| run.status.is_terminal() && run.completed_steps.len() == 4)
        .times(1)
        .returning(|_| Ok(()));

    let pipeline = TestPipelineBuilder::new(diamond_steps())
        .repository(Arc::new(repository))
        .build()
        .unwrap();

    pipeline.orchestrator.start_run().await.unwrap();
}

#[test]
fn definition_errors_are_rejected_before_any_run() {
    let cyclic = TestPipelineBuilder::new(vec![step("a", &["c"]), step("b", &["a"]), step("c", &["b"])]).build();
    assert!(matches!(cyclic.err(), Some(CoreError::CyclicDependency { .. })));

    let unknown = TestPipelineBuilder::new(vec![step("a", &["ghost"])]).build();
    assert!(matches!(unknown.err(), Some(CoreError::UnknownDependency { .. })));

    let duplicate = TestPipelineBuilder::new(vec![step("a", &[]), step("a", &[])]).build();
    assert!(matches!(duplicate.err(), Some(CoreError::DuplicateStep(_))));
}

#[test]
fn cyclic_definitions_never_yield_a_partial_order() {
    let steps = vec![step("ok", &[]), step("x", &["y"]), step("y", &["x"])];
    match resolve_order(&steps) {
        Err(CoreError::CyclicDependency { steps }) => assert_eq!(steps, vec!["x", "y"]),
        other => panic!("expected cyclic dependency, got {:?}", other),
    }
}

#[test]
fn build_context_is_idempotent_across_calls() {
    let mut run = Run::new(sample_sources());
    run.start().unwrap();
    run.commit(StepResult::ok(StepId::new("A"), json!({"a": [1, 2, 3]}), 1)).unwrap();
    run.commit(StepResult::ok(StepId::new("B"), json!({"b": "x"}), 2)).unwrap();
    run.commit(StepResult::ok(StepId::new("C"), json!({"c": null}), 1)).unwrap();

    let steps = diamond_steps();
    let d = &steps[3];
    let first = build_context(d, &run).unwrap();
    let second = build_context(d, &run).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first.to_value()).unwrap(),
        serde_json::to_string(&second.to_value()).unwrap()
    );
}

#[tokio::test(start_paused = true)]
async fn source_fetch_failure_runs_with_no_documents() {
    use aoma_core::{ReasoningResponse, RunOrchestrator, StepExecutor, StepRegistry};
    use aoma_test_utils::mocks::{MockReasoningService, MockSourceProvider};

    let mut sources = MockSourceProvider::new();
    sources
        .expect_fetch()
        .times(1)
        .returning(|| Err(CoreError::SourceError("feed offline".to_string())));

    let mut reasoning = MockReasoningService::new();
    reasoning
        .expect_invoke()
        .withf(|request| request.step_id.as_str() == "A")
        .times(1)
        .returning(|_| Ok(ReasoningResponse::new(r#"{"ok": true}"#)));

    let registry = Arc::new(StepRegistry::from_steps(vec![step("A", &[])]).unwrap());
    let run = RunOrchestrator::new(registry, StepExecutor::new(Arc::new(reasoning)))
        .unwrap()
        .with_sources(Arc::new(sources))
        .start_run()
        .await
        .unwrap();

    assert!(run.source_documents.is_empty());
    assert_step_ok(&run, "A", 1).unwrap();
}

#[tokio::test(start_paused = true)]
async fn renderer_sees_every_step_once_the_run_is_final() {
    use aoma_core::{RunOrchestrator, StepExecutor, StepRegistry};
    use aoma_test_utils::mocks::MockReportRenderer;

    let mut renderer = MockReportRenderer::new();
    renderer
        .expect_render()
        .withf(|report| report.status == RunStatus::Succeeded && report.completed_steps.len() == 4)
        .times(1)
        .returning(|_| Ok(()));

    let registry = Arc::new(StepRegistry::from_steps(diamond_steps()).unwrap());
    RunOrchestrator::new(registry, StepExecutor::new(Arc::new(ScriptedReasoningService::new())))
        .unwrap()
        .with_renderer(Arc::new(renderer))
        .start_run()
        .await
        .unwrap();
}
