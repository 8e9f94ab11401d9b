use thiserror::Error;

/// Core error type for the AOMA pipeline runtime
///
/// Step-level failures (service errors, schema violations) never surface as a
/// `CoreError`; they are recorded as failed `StepResult`s. The variants here
/// are either definition errors detected before a run starts, invariant
/// violations, or infrastructure errors from collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A step id was registered twice
    #[error("Duplicate step: {0}")]
    DuplicateStep(String),

    /// A step declares a dependency that is not registered
    #[error("Step {step} depends on unknown step: {dependency}")]
    UnknownDependency {
        /// The step declaring the dependency
        step: String,
        /// The missing dependency id
        dependency: String,
    },

    /// The dependency relation contains a cycle
    #[error("Cyclic dependency among steps: {}", .steps.join(", "))]
    CyclicDependency {
        /// Steps that could not be scheduled, in declaration order
        steps: Vec<String>,
    },

    /// A dependency had no committed result when its dependent was assembled
    #[error("Missing result for dependency {dependency} of step {step}")]
    MissingDependencyResult {
        /// The step whose context was being built
        step: String,
        /// The dependency without a committed result
        dependency: String,
    },

    /// A result was committed twice for the same step in the same run
    #[error("Result already committed for step: {0}")]
    AlreadyCommitted(String),

    /// A step's output schema is not a valid JSON Schema
    #[error("Invalid output schema for step {step}: {reason}")]
    InvalidOutputSchema {
        /// The step owning the schema
        step: String,
        /// Compilation failure
        reason: String,
    },

    /// Illegal run status transition
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Finalization was attempted before every step had a result
    #[error("Run is incomplete, no result for: {}", .0.join(", "))]
    IncompleteRun(Vec<String>),

    /// Step not found in the registry
    #[error("Step not found: {0}")]
    StepNotFound(String),

    /// Run not found in the repository
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// State store error
    #[error("State store error: {0}")]
    StateStoreError(String),

    /// Input/output error
    #[error("Input/output error: {0}")]
    IOError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Source collaborator error
    #[error("Source error: {0}")]
    SourceError(String),

    /// Renderer collaborator error
    #[error("Render error: {0}")]
    RenderError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Whether this error must abort the whole run
    ///
    /// Definition errors and ordering invariant violations are fatal. Anything
    /// else is an infrastructure failure the caller may choose to tolerate.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CoreError::DuplicateStep(_)
                | CoreError::UnknownDependency { .. }
                | CoreError::CyclicDependency { .. }
                | CoreError::MissingDependencyResult { .. }
                | CoreError::AlreadyCommitted(_)
                | CoreError::InvalidOutputSchema { .. }
        )
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::IOError(err.to_string())
    }
}

impl From<String> for CoreError {
    fn from(err: String) -> Self {
        CoreError::Other(err)
    }
}

impl From<&str> for CoreError {
    fn from(err: &str) -> Self {
        CoreError::Other(err.to_string())
    }
}
