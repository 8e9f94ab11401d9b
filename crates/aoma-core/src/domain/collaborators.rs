//! Interfaces of the external collaborators the pipeline depends on

use crate::domain::run::{Run, RunId, RunStatus, StepResult};
use crate::domain::step_definition::{StepDefinition, StepId};
use crate::CoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Failure of a reasoning service call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Network error, timeout, rate limit or overload. Eligible for retry.
    #[error("Transient service error: {0}")]
    Transient(String),

    /// Invalid request or content rejection. Never retried.
    #[error("Permanent service error: {0}")]
    Permanent(String),
}

impl ServiceError {
    /// Whether the call may be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Transient(_))
    }
}

/// One call to the reasoning service
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRequest {
    /// Step issuing the call
    pub step_id: StepId,

    /// System prompt
    pub system_prompt: String,

    /// Rendered user prompt
    pub prompt: String,

    /// Structured context the prompt was rendered from
    pub context: Value,

    /// Completion budget
    pub max_tokens: u32,

    /// Upper bound on the call's duration
    pub timeout: Duration,
}

/// Raw response of the reasoning service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningResponse {
    /// Response text, expected to contain a JSON object
    pub text: String,
}

impl ReasoningResponse {
    /// Wrap response text
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// External reasoning (LLM) service
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Invoke the service
    async fn invoke(&self, request: ReasoningRequest) -> Result<ReasoningResponse, ServiceError>;
}

/// A document fed to source-consuming steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// URL or citation of the source
    pub source_reference: String,

    /// Relevant excerpt
    pub content_snippet: String,
}

impl SourceDocument {
    /// Create a source document
    pub fn new(source_reference: impl Into<String>, content_snippet: impl Into<String>) -> Self {
        Self {
            source_reference: source_reference.into(),
            content_snippet: content_snippet.into(),
        }
    }
}

/// Provider of source documents for a run
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Fetch the documents. An empty list is a valid answer.
    async fn fetch(&self) -> Result<Vec<SourceDocument>, CoreError>;
}

/// Everything a renderer needs about a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// The run
    pub run_id: RunId,

    /// Terminal status
    pub status: RunStatus,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished
    pub finished_at: Option<DateTime<Utc>>,

    /// Whether the run was cancelled
    pub cancelled: bool,

    /// Step ids in execution order
    pub step_order: Vec<StepId>,

    /// Display names of the steps
    pub step_names: BTreeMap<StepId, String>,

    /// Every step's result
    pub completed_steps: BTreeMap<StepId, StepResult>,

    /// Documents the run was seeded with
    pub source_documents: Vec<SourceDocument>,
}

impl RunReport {
    /// Build a report from a run and its steps in execution order
    pub fn new<'a>(run: &Run, steps: impl IntoIterator<Item = &'a StepDefinition>) -> Self {
        let (step_order, step_names) = steps
            .into_iter()
            .map(|s| (s.id.clone(), (s.id.clone(), s.name.clone())))
            .unzip::<_, _, Vec<_>, BTreeMap<_, _>>();

        Self {
            run_id: run.run_id.clone(),
            status: run.status,
            started_at: run.started_at,
            finished_at: run.finished_at,
            cancelled: run.cancelled,
            step_order,
            step_names,
            completed_steps: run.completed_steps.snapshot(),
            source_documents: run.source_documents.clone(),
        }
    }

    /// Display name of a step, falling back to its id
    pub fn step_name<'a>(&'a self, id: &'a StepId) -> &'a str {
        self.step_names.get(id).map(String::as_str).unwrap_or(id.as_str())
    }

    /// Results in execution order
    pub fn ordered_results(&self) -> impl Iterator<Item = (&StepId, Option<&StepResult>)> {
        self.step_order.iter().map(move |id| (id, self.completed_steps.get(id)))
    }
}

/// Downstream renderer of finished runs
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// Render the report
    async fn render(&self, report: &RunReport) -> Result<(), CoreError>;
}
