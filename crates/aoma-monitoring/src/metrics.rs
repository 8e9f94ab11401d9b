//! Pipeline metrics derived from run events.

use crate::{MetricType, MetricsCollector};
use aoma_core::{
    DomainEvent, LoggingEventHandler, RunCancelled, RunEventHandler, RunFinalized, RunId, RunStarted, StepCommitted,
    StepSkipped, StepStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

/// Metric names
pub mod names {
    /// Runs finished, labelled by status
    pub const RUNS_TOTAL: &str = "aoma_runs_total";
    /// Wall-clock duration of a run
    pub const RUN_DURATION_MS: &str = "aoma_run_duration_ms";
    /// Steps committed, labelled by step and status
    pub const STEPS_TOTAL: &str = "aoma_steps_total";
    /// Service invocations per committed step
    pub const STEP_ATTEMPTS: &str = "aoma_step_attempts";
    /// Steps skipped for an upstream failure
    pub const STEPS_SKIPPED: &str = "aoma_steps_skipped_total";
    /// Runs cancelled
    pub const RUNS_CANCELLED: &str = "aoma_runs_cancelled_total";
}

fn labels<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Collector that emits every metric as a structured log event
#[derive(Debug, Default, Clone)]
pub struct TracingMetricsCollector;

impl MetricsCollector for TracingMetricsCollector {
    fn record_metric(&self, name: &str, value: f64, metric_type: MetricType, labels: BTreeMap<String, String>) {
        info!(metric = name, value, metric_type = ?metric_type, labels = ?labels, "Metric");
    }
}

/// One recorded metric
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMetric {
    /// Metric name
    pub name: String,
    /// Recorded value
    pub value: f64,
    /// Metric type
    pub metric_type: MetricType,
    /// Labels
    pub labels: BTreeMap<String, String>,
}

/// Collector keeping metrics in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryMetricsCollector {
    metrics: Arc<Mutex<Vec<RecordedMetric>>>,
}

impl InMemoryMetricsCollector {
    /// Empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far
    pub fn recorded(&self) -> Vec<RecordedMetric> {
        self.metrics.lock().clone()
    }

    /// Metrics with the given name
    pub fn named(&self, name: &str) -> Vec<RecordedMetric> {
        self.metrics.lock().iter().filter(|m| m.name == name).cloned().collect()
    }

    /// Sum of the values recorded under `name` whose labels include `label`
    pub fn sum(&self, name: &str, label: Option<(&str, &str)>) -> f64 {
        self.named(name)
            .iter()
            .filter(|m| match label {
                Some((k, v)) => m.labels.get(k).map(String::as_str) == Some(v),
                None => true,
            })
            .map(|m| m.value)
            .sum()
    }
}

impl MetricsCollector for InMemoryMetricsCollector {
    fn record_metric(&self, name: &str, value: f64, metric_type: MetricType, labels: BTreeMap<String, String>) {
        self.metrics.lock().push(RecordedMetric {
            name: name.to_string(),
            value,
            metric_type,
            labels,
        });
    }
}

/// Run event handler recording run and step outcomes
///
/// Every event is also passed on to the [`LoggingEventHandler`].
pub struct PipelineMetrics {
    collector: Arc<dyn MetricsCollector>,
    run_starts: Mutex<HashMap<RunId, DateTime<Utc>>>,
    logging: LoggingEventHandler,
}

impl PipelineMetrics {
    /// Metrics written to the given collector
    pub fn new(collector: Arc<dyn MetricsCollector>) -> Self {
        Self {
            collector,
            run_starts: Mutex::new(HashMap::new()),
            logging: LoggingEventHandler,
        }
    }

    fn record(&self, event: &dyn DomainEvent) {
        let any = event.as_any();

        if let Some(started) = any.downcast_ref::<RunStarted>() {
            self.run_starts.lock().insert(started.run_id.clone(), started.timestamp);
        } else if let Some(committed) = any.downcast_ref::<StepCommitted>() {
            let status = if committed.status == StepStatus::Ok { "ok" } else { "failed" };
            self.collector.record_metric(
                names::STEPS_TOTAL,
                1.0,
                MetricType::Counter,
                labels([("step_id", committed.step_id.0.clone()), ("status", status.to_string())]),
            );
            self.collector.record_metric(
                names::STEP_ATTEMPTS,
                f64::from(committed.attempt_count),
                MetricType::Histogram,
                labels([("step_id", committed.step_id.0.clone())]),
            );
        } else if let Some(skipped) = any.downcast_ref::<StepSkipped>() {
            self.collector.record_metric(
                names::STEPS_SKIPPED,
                1.0,
                MetricType::Counter,
                labels([("step_id", skipped.step_id.0.clone())]),
            );
        } else if any.downcast_ref::<RunCancelled>().is_some() {
            self.collector
                .record_metric(names::RUNS_CANCELLED, 1.0, MetricType::Counter, BTreeMap::new());
        } else if let Some(finalized) = any.downcast_ref::<RunFinalized>() {
            let status = finalized.status.to_string();
            self.collector.record_metric(
                names::RUNS_TOTAL,
                1.0,
                MetricType::Counter,
                labels([("status", status.clone())]),
            );

            if let Some(started) = self.run_starts.lock().remove(&finalized.run_id) {
                let duration_ms = (finalized.timestamp - started).num_milliseconds().max(0);
                self.collector.record_metric(
                    names::RUN_DURATION_MS,
                    duration_ms as f64,
                    MetricType::Histogram,
                    labels([("status", status.clone())]),
                );
                info!(
                    run_id = %finalized.run_id,
                    status = %status,
                    duration_ms,
                    ok_steps = finalized.ok_steps,
                    failed_steps = finalized.failed_steps,
                    "Run metrics"
                );
            }
        }
    }
}

#[async_trait]
impl RunEventHandler for PipelineMetrics {
    async fn handle_event(&self, event: Box<dyn DomainEvent>) {
        self.record(event.as_ref());
        self.logging.handle_event(event).await;
    }
}
