use crate::domain::collaborators::{ReasoningRequest, ReasoningService, ServiceError};
use crate::domain::context::StepContext;
use crate::domain::run::{Run, StepResult};
use crate::domain::step_definition::StepDefinition;
use crate::CoreError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on a single reasoning call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Retry policy for transient step failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,

    /// Upper bound on a single delay
    pub max_delay: Duration,

    /// Fraction of the delay used as random jitter
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(30_000),
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total attempts allowed, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let initial_ms = self.initial_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;
        let exponent = attempt.saturating_sub(1) as i32;
        let base_delay_ms = (initial_ms * self.backoff_multiplier.powi(exponent)).min(max_ms) as u64;

        // jitter in [-range/2, +range/2)
        let jitter_range = (base_delay_ms as f64 * self.jitter_factor) as u64;
        let jitter = if jitter_range > 0 {
            let rand_value = (uuid::Uuid::new_v4().as_u128() % jitter_range as u128) as i64;
            (rand_value - (jitter_range as i64 / 2)).max(-(base_delay_ms as i64 / 2))
        } else {
            0
        };

        Duration::from_millis((base_delay_ms as i64 + jitter).max(1) as u64)
    }
}

/// Extract the JSON object from a response text.
///
/// Tries a ```` ```json ```` fence, then a bare ```` ``` ```` fence, then the
/// whole text, then the outermost `{ ... }` slice.
pub fn extract_json(text: &str) -> Result<Value, String> {
    let fenced = if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        Some(body.find("```").map_or(body, |end| &body[..end]))
    } else if let Some(start) = text.find("```") {
        let body = &text[start + 3..];
        // skip an info string such as ```JSON
        let body = body.find('\n').map_or(body, |nl| {
            if body[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) {
                &body[nl + 1..]
            } else {
                body
            }
        });
        Some(body.find("```").map_or(body, |end| &body[..end]))
    } else {
        None
    };

    let candidate = fenced.unwrap_or(text).trim();
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let sliced = match (text.find('{'), text.rfind('}')) {
                (Some(start), Some(end)) if start < end => serde_json::from_str::<Value>(&text[start..=end]).ok(),
                _ => None,
            };
            sliced.ok_or_else(|| format!("Response is not valid JSON: {}", first_err))
        }
    }
}

/// Invokes the reasoning service for one step and turns the outcome into a
/// `StepResult`.
#[derive(Clone)]
pub struct StepExecutor {
    reasoning: Arc<dyn ReasoningService>,
    retry_policy: RetryPolicy,
    call_timeout: Duration,
}

impl StepExecutor {
    /// Create an executor with the default retry policy and call timeout
    pub fn new(reasoning: Arc<dyn ReasoningService>) -> Self {
        Self {
            reasoning,
            retry_policy: RetryPolicy::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Set the retry policy
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Set the per-call timeout
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// The retry policy in use
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Execute a step. Never fails: every failure is returned as a failed
    /// `StepResult`.
    pub async fn execute(&self, step: &StepDefinition, context: &StepContext) -> StepResult {
        let schema = match step.prompt_contract.compile_schema() {
            Ok(schema) => schema,
            Err(reason) => {
                return StepResult::failed(step.id.clone(), format!("Invalid output schema: {}", reason), 0);
            }
        };

        let request = ReasoningRequest {
            step_id: step.id.clone(),
            system_prompt: step.prompt_contract.system_prompt.clone(),
            prompt: step.prompt_contract.render(context),
            context: context.to_value(),
            max_tokens: step.prompt_contract.max_tokens,
            timeout: self.call_timeout,
        };

        let max_attempts = self.retry_policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(step_id = %step.id, attempt, max_attempts, "Invoking reasoning service");

            let outcome = match tokio::time::timeout(self.call_timeout, self.reasoning.invoke(request.clone())).await {
                Ok(Ok(response)) => self.validate(&schema, &response.text),
                Ok(Err(err)) => Err(err),
                Err(_) => Err(ServiceError::Transient(format!(
                    "Call timed out after {}s",
                    self.call_timeout.as_secs_f64()
                ))),
            };

            match outcome {
                Ok(payload) => {
                    let warnings = step.acceptance_warnings(&payload);
                    for warning in &warnings {
                        warn!(step_id = %step.id, warning = %warning, "Acceptance check failed");
                    }
                    info!(step_id = %step.id, attempt, "Step completed");
                    return StepResult::ok(step.id.clone(), payload, attempt).with_warnings(warnings);
                }
                Err(ServiceError::Permanent(reason)) => {
                    warn!(step_id = %step.id, attempt, error = %reason, "Step failed permanently");
                    return StepResult::failed(step.id.clone(), ServiceError::Permanent(reason).to_string(), attempt);
                }
                Err(ServiceError::Transient(reason)) if attempt < max_attempts => {
                    let delay = self.retry_policy.delay_for(attempt);
                    warn!(
                        step_id = %step.id,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %reason,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(ServiceError::Transient(reason)) => {
                    warn!(step_id = %step.id, attempt, error = %reason, "Retries exhausted");
                    return StepResult::failed(
                        step.id.clone(),
                        format!("Retries exhausted after {} attempts: {}", attempt, reason),
                        attempt,
                    );
                }
            }
        }
    }

    /// Execute a step and commit its result into the run
    pub async fn execute_and_commit(
        &self,
        step: &StepDefinition,
        context: &StepContext,
        run: &Run,
    ) -> Result<StepResult, CoreError> {
        let result = self.execute(step, context).await;
        run.commit(result.clone())?;
        Ok(result)
    }

    fn validate(&self, schema: &jsonschema::JSONSchema, text: &str) -> Result<Value, ServiceError> {
        let payload = extract_json(text).map_err(ServiceError::Transient)?;

        let errors: Vec<String> = match schema.validate(&payload) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{}: {}", path, e)
                    }
                })
                .collect(),
        };

        if errors.is_empty() {
            Ok(payload)
        } else {
            Err(ServiceError::Transient(format!(
                "Schema validation failed: {}",
                errors.join("; ")
            )))
        }
    }
}

impl std::fmt::Debug for StepExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepExecutor")
            .field("retry_policy", &self.retry_policy)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}
