//! Assertion utilities for validating finished runs.

use aoma_core::{Run, RunStatus, StepId, StepResult, StepStatus};
use thiserror::Error;

/// Error type for run validation failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunAssertionError {
    #[error("Invalid run status: expected {expected}, got {actual}")]
    InvalidStatus { expected: RunStatus, actual: RunStatus },

    #[error("No result committed for step: {0}")]
    MissingResult(String),

    #[error("Step {step} has status {actual:?}, expected {expected:?}")]
    InvalidStepStatus {
        step: String,
        expected: StepStatus,
        actual: StepStatus,
    },

    #[error("Step {step} has error {actual:?}, expected {expected:?}")]
    InvalidStepError {
        step: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    #[error("Step {step} made {actual} attempts, expected {expected}")]
    InvalidAttemptCount { step: String, expected: u32, actual: u32 },
}

/// Asserts the run ended with the expected status.
pub fn assert_run_status(run: &Run, expected: RunStatus) -> Result<(), RunAssertionError> {
    if run.status != expected {
        return Err(RunAssertionError::InvalidStatus {
            expected,
            actual: run.status,
        });
    }
    Ok(())
}

/// Returns the committed result of a step.
pub fn result_of(run: &Run, step: &str) -> Result<StepResult, RunAssertionError> {
    run.completed_steps
        .get(&StepId::new(step))
        .ok_or_else(|| RunAssertionError::MissingResult(step.to_string()))
}

/// Asserts a step completed ok after exactly `attempts` attempts.
pub fn assert_step_ok(run: &Run, step: &str, attempts: u32) -> Result<(), RunAssertionError> {
    let result = result_of(run, step)?;
    if result.status != StepStatus::Ok {
        return Err(RunAssertionError::InvalidStepStatus {
            step: step.to_string(),
            expected: StepStatus::Ok,
            actual: result.status,
        });
    }
    if result.attempt_count != attempts {
        return Err(RunAssertionError::InvalidAttemptCount {
            step: step.to_string(),
            expected: attempts,
            actual: result.attempt_count,
        });
    }
    Ok(())
}

/// Asserts a step failed, optionally with an exact error message.
pub fn assert_step_failed(run: &Run, step: &str, error: Option<&str>) -> Result<(), RunAssertionError> {
    let result = result_of(run, step)?;
    if result.status != StepStatus::Failed {
        return Err(RunAssertionError::InvalidStepStatus {
            step: step.to_string(),
            expected: StepStatus::Failed,
            actual: result.status,
        });
    }
    if let Some(expected) = error {
        if result.error.as_deref() != Some(expected) {
            return Err(RunAssertionError::InvalidStepError {
                step: step.to_string(),
                expected: Some(expected.to_string()),
                actual: result.error,
            });
        }
    }
    Ok(())
}

/// Asserts a step was skipped because of an upstream failure.
pub fn assert_step_skipped(run: &Run, step: &str) -> Result<(), RunAssertionError> {
    assert_step_failed(run, step, Some(StepResult::UPSTREAM_FAILED))?;
    let result = result_of(run, step)?;
    if result.attempt_count != 0 {
        return Err(RunAssertionError::InvalidAttemptCount {
            step: step.to_string(),
            expected: 0,
            actual: result.attempt_count,
        });
    }
    Ok(())
}

/// Asserts every listed step has a committed result.
pub fn assert_complete_result_set(run: &Run, steps: &[&str]) -> Result<(), RunAssertionError> {
    for step in steps {
        result_of(run, step)?;
    }
    Ok(())
}
