//!
//! AOMA Core - pipeline runtime for the ADAS opportunity mapping report
//!
//! This crate defines the step registry, the dependency resolver, the run
//! aggregate and the services that execute a run. External collaborators
//! (reasoning service, sources, renderer, persistence) are traits
//! implemented by the other crates of the workspace.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - steps, runs and collaborator interfaces
pub mod domain;

/// Application services - context assembly, step execution, orchestration
pub mod application;

/// Error types
pub mod error;

// Re-export key types
pub use error::CoreError;

pub use domain::collaborators::{
    ReasoningRequest, ReasoningResponse, ReasoningService, ReportRenderer, RunReport, ServiceError,
    SourceDocument, SourceProvider,
};
pub use domain::context::StepContext;
pub use domain::dependency_graph::{resolve_order, DependencyGraph, ExecutionOrder};
pub use domain::events::{
    DomainEvent, LoggingEventHandler, RunCancelled, RunCreated, RunEventHandler, RunFinalized, RunStarted, StepCommitted,
    StepSkipped,
};
pub use domain::repository::{RunRepository, RunSummary};
pub use domain::run::{OutputStore, Run, RunId, RunStatus, StepResult, StepStatus};
pub use domain::step_definition::{
    AcceptanceCheck, PromptContract, StepDefinition, StepId, StepRegistry, DEFAULT_MAX_TOKENS,
};

pub use application::context_assembler::build_context;
pub use application::run_orchestrator::{CancellationHandle, ExecutionMode, RunOrchestrator};
pub use application::step_executor::{extract_json, RetryPolicy, StepExecutor, DEFAULT_CALL_TIMEOUT};
