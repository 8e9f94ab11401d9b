//! A reasoning service whose responses are scripted per step.

use aoma_core::{ReasoningRequest, ReasoningResponse, ReasoningService, ServiceError, StepId};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

/// One scripted reaction to an invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedOutcome {
    /// Respond with this JSON value, serialized as the response text
    Respond(Value),

    /// Respond with raw text
    Text(String),

    /// Fail transiently
    Transient(String),

    /// Fail permanently
    Permanent(String),

    /// Never answer within any reasonable timeout
    Hang,
}

/// Reasoning service fake driven by per-step queues of outcomes.
///
/// Steps without a script, or whose script is exhausted, get the default
/// response: `{"step": "<id>"}` unless overridden.
#[derive(Default)]
pub struct ScriptedReasoningService {
    scripts: Mutex<HashMap<StepId, VecDeque<ScriptedOutcome>>>,
    defaults: Mutex<HashMap<StepId, Value>>,
    requests: Mutex<Vec<ReasoningRequest>>,
}

impl fmt::Debug for ScriptedReasoningService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedReasoningService")
            .field("scripted_steps", &self.scripts.lock().len())
            .field("requests", &self.requests.lock().len())
            .finish()
    }
}

impl ScriptedReasoningService {
    /// Creates a service that answers every step with the default response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for a step, consumed one per invocation.
    pub fn script(self, step: &str, outcomes: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        self.scripts
            .lock()
            .entry(StepId::new(step))
            .or_default()
            .extend(outcomes);
        self
    }

    /// Always respond to a step with this payload.
    pub fn respond(self, step: &str, payload: Value) -> Self {
        self.defaults.lock().insert(StepId::new(step), payload);
        self
    }

    /// Fail a step permanently on its first invocation.
    pub fn fail_permanently(self, step: &str) -> Self {
        self.script(step, [ScriptedOutcome::Permanent(format!("{} rejected", step))])
    }

    /// Fail a step transiently `times` times before answering normally.
    pub fn fail_transiently(self, step: &str, times: usize) -> Self {
        let outcomes = (0..times).map(|i| ScriptedOutcome::Transient(format!("{} transient #{}", step, i + 1)));
        self.script(step, outcomes.collect::<Vec<_>>())
    }

    /// Number of invocations made for a step.
    pub fn invocations_for(&self, step: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.step_id.as_str() == step)
            .count()
    }

    /// Step ids in invocation order, one entry per invocation.
    pub fn invoked_steps(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.step_id.0.clone()).collect()
    }

    /// Every request received.
    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests.lock().clone()
    }

    /// Total number of invocations.
    pub fn total_invocations(&self) -> usize {
        self.requests.lock().len()
    }

    fn default_response(&self, step: &StepId) -> Value {
        self.defaults
            .lock()
            .get(step)
            .cloned()
            .unwrap_or_else(|| json!({ "step": step.as_str() }))
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoningService {
    async fn invoke(&self, request: ReasoningRequest) -> Result<ReasoningResponse, ServiceError> {
        let step = request.step_id.clone();
        self.requests.lock().push(request);

        let next = self.scripts.lock().get_mut(&step).and_then(VecDeque::pop_front);
        tracing::debug!(step_id = %step, outcome = ?next, "Scripted reasoning call");

        match next {
            None => Ok(ReasoningResponse::new(self.default_response(&step).to_string())),
            Some(ScriptedOutcome::Respond(value)) => Ok(ReasoningResponse::new(value.to_string())),
            Some(ScriptedOutcome::Text(text)) => Ok(ReasoningResponse::new(text)),
            Some(ScriptedOutcome::Transient(reason)) => Err(ServiceError::Transient(reason)),
            Some(ScriptedOutcome::Permanent(reason)) => Err(ServiceError::Permanent(reason)),
            Some(ScriptedOutcome::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(ServiceError::Transient("hung call returned".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(step: &str) -> ReasoningRequest {
        ReasoningRequest {
            step_id: StepId::new(step),
            system_prompt: String::new(),
            prompt: String::new(),
            context: json!({}),
            max_tokens: 10,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_script_is_consumed_in_order_then_defaults() {
        let service = ScriptedReasoningService::new()
            .fail_transiently("a", 1)
            .respond("a", json!({"ok": true}));

        assert!(matches!(service.invoke(request("a")).await, Err(ServiceError::Transient(_))));
        assert_eq!(service.invoke(request("a")).await.unwrap().text, r#"{"ok":true}"#);
        assert_eq!(service.invoke(request("b")).await.unwrap().text, r#"{"step":"b"}"#);

        assert_eq!(service.invocations_for("a"), 2);
        assert_eq!(service.invoked_steps(), vec!["a", "a", "b"]);
    }
}
