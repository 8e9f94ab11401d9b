//! Monitoring for the AOMA pipeline.
//!
//! Sets up the `tracing` subscriber and turns run events into metrics.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub mod logging;
pub mod metrics;

/// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "info,aoma=debug";

/// Type of metric for collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricType {
    /// Counter metrics accumulate values
    Counter,
    /// Gauge metrics record current values
    Gauge,
    /// Histogram metrics observe distributions
    Histogram,
}

/// Interface for collecting metrics
pub trait MetricsCollector: Send + Sync {
    /// Record a metric with the given name, value, type, and labels
    fn record_metric(&self, name: &str, value: f64, metric_type: MetricType, labels: BTreeMap<String, String>);
}

/// Configuration for initializing logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log level filter, overridden by `RUST_LOG`
    pub log_filter: String,
    /// JSON instead of pretty stdout logs
    pub json_logs: bool,
    /// Directory for daily-rotated JSON log files, `None` disables file logging
    pub log_dir: Option<PathBuf>,
    /// File name prefix of the log files
    pub log_file_prefix: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "aoma".to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            json_logs: false,
            log_dir: Some(PathBuf::from("logs")),
            log_file_prefix: "aoma".to_string(),
        }
    }
}


// Exported types
pub use crate::logging::{init_logging, LogExt};
pub use crate::metrics::{InMemoryMetricsCollector, PipelineMetrics, RecordedMetric, TracingMetricsCollector};
