use crate::domain::run::{RunId, RunStatus, StepStatus};
use crate::domain::step_definition::StepId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt::Debug;
use tracing::{info, warn};

/// Domain event trait for all events in the system
pub trait DomainEvent: Debug + Send + Sync {
    /// Returns the type of the event as a string
    fn event_type(&self) -> &'static str;

    /// Returns the run this event is associated with
    fn run_id(&self) -> &RunId;

    /// Returns the timestamp when the event occurred
    fn timestamp(&self) -> DateTime<Utc>;

    /// Convert to Any for downcasting to the concrete event
    fn as_any(&self) -> &dyn Any;
}

macro_rules! impl_domain_event {
    ($ty:ty, $name:literal) => {
        impl DomainEvent for $ty {
            fn event_type(&self) -> &'static str {
                $name
            }

            fn run_id(&self) -> &RunId {
                &self.run_id
            }

            fn timestamp(&self) -> DateTime<Utc> {
                self.timestamp
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

/// Event: Run created
#[derive(Debug)]
pub struct RunCreated {
    /// The run
    pub run_id: RunId,

    /// When the run was created
    pub timestamp: DateTime<Utc>,
}

/// Event: Run started executing steps
#[derive(Debug)]
pub struct RunStarted {
    /// The run
    pub run_id: RunId,

    /// When the run started
    pub timestamp: DateTime<Utc>,
}

/// Event: Step result committed
#[derive(Debug)]
pub struct StepCommitted {
    /// The run
    pub run_id: RunId,

    /// The step
    pub step_id: StepId,

    /// Committed status
    pub status: StepStatus,

    /// Service invocations made
    pub attempt_count: u32,

    /// Failure reason
    pub error: Option<String>,

    /// When the result was committed
    pub timestamp: DateTime<Utc>,
}

/// Event: Step skipped because a dependency failed
#[derive(Debug)]
pub struct StepSkipped {
    /// The run
    pub run_id: RunId,

    /// The skipped step
    pub step_id: StepId,

    /// When the step was skipped
    pub timestamp: DateTime<Utc>,
}

/// Event: Run cancelled between steps
#[derive(Debug)]
pub struct RunCancelled {
    /// The run
    pub run_id: RunId,

    /// Steps that had not executed
    pub pending_steps: usize,

    /// When the cancellation was observed
    pub timestamp: DateTime<Utc>,
}

/// Event: Run reached a terminal status
#[derive(Debug)]
pub struct RunFinalized {
    /// The run
    pub run_id: RunId,

    /// Terminal status
    pub status: RunStatus,

    /// Steps that completed ok
    pub ok_steps: usize,

    /// Steps that failed, were skipped or cancelled
    pub failed_steps: usize,

    /// When the run was finalized
    pub timestamp: DateTime<Utc>,
}

impl_domain_event!(RunCreated, "run.created");
impl_domain_event!(RunStarted, "run.started");
impl_domain_event!(StepCommitted, "step.committed");
impl_domain_event!(StepSkipped, "step.skipped");
impl_domain_event!(RunCancelled, "run.cancelled");
impl_domain_event!(RunFinalized, "run.finalized");

/// Handler for run events
#[async_trait]
pub trait RunEventHandler: Send + Sync {
    /// Handle one event
    async fn handle_event(&self, event: Box<dyn DomainEvent>);
}

/// Handler that writes every event to the log
#[derive(Debug, Default, Clone)]
pub struct LoggingEventHandler;

#[async_trait]
impl RunEventHandler for LoggingEventHandler {
    async fn handle_event(&self, event: Box<dyn DomainEvent>) {
        match event.event_type() {
            "run.cancelled" => warn!(run_id = %event.run_id(), event = ?event, "Run event"),
            _ => info!(run_id = %event.run_id(), event_type = event.event_type(), "Run event"),
        }
    }
}
