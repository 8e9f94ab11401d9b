use crate::{
    domain::{
        collaborators::SourceDocument,
        events::{DomainEvent, RunCancelled, RunCreated, RunFinalized, RunStarted},
        step_definition::StepId,
    },
    CoreError,
};
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Value object: Run ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a fresh run id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, no step started
    Pending,

    /// Steps are executing
    Running,

    /// Every step completed ok
    Succeeded,

    /// Some steps completed ok, others failed or were skipped
    PartiallyFailed,

    /// Every step failed or was skipped
    Failed,
}

impl RunStatus {
    /// Whether the run has left `running`
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::PartiallyFailed | RunStatus::Failed)
    }

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::PartiallyFailed => "partially_failed",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal status of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Validated payload committed
    Ok,

    /// Failed, skipped or cancelled
    Failed,
}

/// Outcome of one step within one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step this result belongs to
    pub step_id: StepId,

    /// Terminal status
    pub status: StepStatus,

    /// Validated payload, `null` when the step failed
    pub payload: Value,

    /// Failure reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Number of service invocations made, 0 for skipped steps
    pub attempt_count: u32,

    /// When the result was produced
    pub timestamp: DateTime<Utc>,

    /// Soft acceptance warnings on an otherwise valid payload
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_warnings: Vec<String>,
}

impl StepResult {
    /// Error recorded on steps skipped because an upstream step failed
    pub const UPSTREAM_FAILED: &'static str = "upstream dependency failed";

    /// Error recorded on steps not executed because the run was cancelled
    pub const CANCELLED: &'static str = "cancelled";

    /// A successful result
    pub fn ok(step_id: StepId, payload: Value, attempt_count: u32) -> Self {
        Self {
            step_id,
            status: StepStatus::Ok,
            payload,
            error: None,
            attempt_count,
            timestamp: Utc::now(),
            validation_warnings: Vec::new(),
        }
    }

    /// A failed result
    pub fn failed(step_id: StepId, error: impl Into<String>, attempt_count: u32) -> Self {
        Self {
            step_id,
            status: StepStatus::Failed,
            payload: Value::Null,
            error: Some(error.into()),
            attempt_count,
            timestamp: Utc::now(),
            validation_warnings: Vec::new(),
        }
    }

    /// A step skipped because a dependency failed
    pub fn skipped(step_id: StepId) -> Self {
        Self::failed(step_id, Self::UPSTREAM_FAILED, 0)
    }

    /// A step never executed because the run was cancelled
    pub fn cancelled(step_id: StepId) -> Self {
        Self::failed(step_id, Self::CANCELLED, 0)
    }

    /// Attach acceptance warnings
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.validation_warnings = warnings;
        self
    }

    /// Whether the step completed ok
    pub fn is_ok(&self) -> bool {
        self.status == StepStatus::Ok
    }

    /// Whether the step was skipped for an upstream failure
    pub fn is_skipped(&self) -> bool {
        self.error.as_deref() == Some(Self::UPSTREAM_FAILED)
    }
}

/// Write-once mapping from step id to its result for one run.
///
/// Inserts are atomic per key, so independent steps can commit concurrently
/// without further locking.
#[derive(Debug, Default)]
pub struct OutputStore {
    results: DashMap<StepId, StepResult>,
}

impl OutputStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a result. A second commit for the same step is rejected.
    pub fn commit(&self, result: StepResult) -> Result<(), CoreError> {
        match self.results.entry(result.step_id.clone()) {
            Entry::Occupied(_) => Err(CoreError::AlreadyCommitted(result.step_id.0)),
            Entry::Vacant(slot) => {
                slot.insert(result);
                Ok(())
            }
        }
    }

    /// Result for a step
    pub fn get(&self, id: &StepId) -> Option<StepResult> {
        self.results.get(id).map(|r| r.value().clone())
    }

    /// Payload of a step that completed ok
    pub fn payload(&self, id: &StepId) -> Option<Value> {
        self.results
            .get(id)
            .filter(|r| r.is_ok())
            .map(|r| r.payload.clone())
    }

    /// Whether a step has a committed result
    pub fn contains(&self, id: &StepId) -> bool {
        self.results.contains_key(id)
    }

    /// Number of committed results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether nothing has been committed
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Ordered copy of every committed result
    pub fn snapshot(&self) -> BTreeMap<StepId, StepResult> {
        self.results
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }
}

impl Clone for OutputStore {
    fn clone(&self) -> Self {
        let results = DashMap::with_capacity(self.results.len());
        for r in self.results.iter() {
            results.insert(r.key().clone(), r.value().clone());
        }
        Self { results }
    }
}

impl PartialEq for OutputStore {
    fn eq(&self, other: &Self) -> bool {
        self.snapshot() == other.snapshot()
    }
}

impl Serialize for OutputStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for OutputStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<StepId, StepResult>::deserialize(deserializer)?;
        Ok(Self {
            results: map.into_iter().collect(),
        })
    }
}

/// Aggregate: one execution of the pipeline
#[derive(Debug, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier
    pub run_id: RunId,

    /// Creation timestamp
    pub started_at: DateTime<Utc>,

    /// Finalization timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Current status
    pub status: RunStatus,

    /// Step results committed so far
    pub completed_steps: OutputStore,

    /// Documents returned by the source collaborator
    #[serde(default)]
    pub source_documents: Vec<SourceDocument>,

    /// Whether the run was cancelled before every step executed
    #[serde(default)]
    pub cancelled: bool,

    /// Domain events
    #[serde(skip)]
    pub events: Vec<Box<dyn DomainEvent>>,
}

impl Clone for Run {
    fn clone(&self) -> Self {
        Self {
            run_id: self.run_id.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            status: self.status,
            completed_steps: self.completed_steps.clone(),
            source_documents: self.source_documents.clone(),
            cancelled: self.cancelled,
            events: Vec::new(), // events are not cloned
        }
    }
}

impl Run {
    /// Create a pending run
    pub fn new(source_documents: Vec<SourceDocument>) -> Self {
        let run_id = RunId::generate();
        let now = Utc::now();

        let mut run = Self {
            run_id: run_id.clone(),
            started_at: now,
            finished_at: None,
            status: RunStatus::Pending,
            completed_steps: OutputStore::new(),
            source_documents,
            cancelled: false,
            events: Vec::with_capacity(16),
        };

        run.record_event(Box::new(RunCreated {
            run_id,
            timestamp: now,
        }));

        run
    }

    /// Move from `pending` to `running`
    pub fn start(&mut self) -> Result<(), CoreError> {
        if self.status != RunStatus::Pending {
            return Err(CoreError::InvalidStateTransition(format!(
                "Cannot start run in state: {}",
                self.status
            )));
        }

        self.status = RunStatus::Running;
        self.record_event(Box::new(RunStarted {
            run_id: self.run_id.clone(),
            timestamp: Utc::now(),
        }));
        Ok(())
    }

    /// Commit a step result. Only allowed while running.
    pub fn commit(&self, result: StepResult) -> Result<(), CoreError> {
        if self.status != RunStatus::Running {
            return Err(CoreError::InvalidStateTransition(format!(
                "Cannot commit step {} while run is in state: {}",
                result.step_id, self.status
            )));
        }
        self.completed_steps.commit(result)
    }

    /// Record that the run was cancelled
    pub fn mark_cancelled(&mut self, pending_steps: usize) {
        self.cancelled = true;
        self.record_event(Box::new(RunCancelled {
            run_id: self.run_id.clone(),
            pending_steps,
            timestamp: Utc::now(),
        }));
    }

    /// Set the terminal status.
    ///
    /// Every step in `step_ids` must already have a committed result.
    pub fn finalize<'a>(&mut self, step_ids: impl IntoIterator<Item = &'a StepId>) -> Result<RunStatus, CoreError> {
        if self.status != RunStatus::Running {
            return Err(CoreError::InvalidStateTransition(format!(
                "Cannot finalize run in state: {}",
                self.status
            )));
        }

        let mut missing = Vec::new();
        let mut results = Vec::new();
        for id in step_ids {
            match self.completed_steps.get(id) {
                Some(r) => results.push(r),
                None => missing.push(id.0.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(CoreError::IncompleteRun(missing));
        }

        let status = Self::terminal_status(&results);
        let now = Utc::now();
        self.status = status;
        self.finished_at = Some(now);

        self.record_event(Box::new(RunFinalized {
            run_id: self.run_id.clone(),
            status,
            ok_steps: results.iter().filter(|r| r.is_ok()).count(),
            failed_steps: results.iter().filter(|r| !r.is_ok()).count(),
            timestamp: now,
        }));

        Ok(status)
    }

    /// Status implied by a complete result set
    pub fn terminal_status(results: &[StepResult]) -> RunStatus {
        let ok = results.iter().filter(|r| r.is_ok()).count();
        if ok == results.len() {
            RunStatus::Succeeded
        } else if ok == 0 {
            RunStatus::Failed
        } else {
            RunStatus::PartiallyFailed
        }
    }

    /// Run date, `YYYY-MM-DD`
    pub fn run_date(&self) -> String {
        self.started_at.format("%Y-%m-%d").to_string()
    }

    /// Record a domain event
    #[inline]
    pub fn record_event(&mut self, event: Box<dyn DomainEvent>) {
        self.events.push(event);
    }

    /// Take recorded events
    #[inline]
    pub fn take_events(&mut self) -> Vec<Box<dyn DomainEvent>> {
        std::mem::take(&mut self.events)
    }
}
