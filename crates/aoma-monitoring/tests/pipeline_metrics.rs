use aoma_monitoring::metrics::names;
use aoma_monitoring::{InMemoryMetricsCollector, PipelineMetrics};
use aoma_test_utils::{diamond_steps, ScriptedReasoningService, TestPipelineBuilder};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn metrics_follow_a_partially_failed_run() {
    let collector = InMemoryMetricsCollector::new();
    let pipeline = TestPipelineBuilder::new(diamond_steps())
        .reasoning(ScriptedReasoningService::new().fail_permanently("B"))
        .build()
        .unwrap();
    let orchestrator = pipeline
        .orchestrator
        .with_event_handler(Arc::new(PipelineMetrics::new(Arc::new(collector.clone()))));

    orchestrator.start_run().await.unwrap();

    assert_eq!(collector.sum(names::STEPS_TOTAL, Some(("status", "ok"))), 2.0);
    assert_eq!(collector.sum(names::STEPS_TOTAL, Some(("status", "failed"))), 1.0);
    assert_eq!(collector.sum(names::STEPS_SKIPPED, Some(("step_id", "D"))), 1.0);
    assert_eq!(collector.sum(names::RUNS_TOTAL, Some(("status", "partially_failed"))), 1.0);
    assert_eq!(collector.named(names::RUN_DURATION_MS).len(), 1);
    assert!(collector.named(names::RUNS_CANCELLED).is_empty());
}
