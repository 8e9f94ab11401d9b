use crate::domain::context::StepContext;
use crate::domain::dependency_graph::{resolve_order, ExecutionOrder};
use crate::CoreError;
use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Default completion budget for a step's reasoning call
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Value object: Step ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub String);

impl StepId {
    /// Create a step id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StepId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A soft acceptance rule applied to a validated payload.
///
/// Returns a warning message when the payload is structurally valid but falls
/// short of the step's quality bar. Warnings never fail a step.
pub type AcceptanceCheck = fn(&Value) -> Option<String>;

/// The prompt template and expected output contract of a step
#[derive(Debug, Clone)]
pub struct PromptContract {
    /// System prompt sent alongside the user prompt
    pub system_prompt: String,

    /// User prompt template.
    ///
    /// Recognised placeholders: `{context}`, `{sources}`, `{run_date}` and
    /// `{<dependency_id>}` for every declared dependency. Anything else in
    /// braces is left as-is.
    pub template: String,

    /// JSON Schema (Draft 7) the structured response must satisfy
    pub output_schema: Value,

    /// Completion budget for the reasoning call
    pub max_tokens: u32,
}

impl PromptContract {
    /// Create a contract from a template, accepting any JSON object
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            system_prompt: String::new(),
            template: template.into(),
            output_schema: serde_json::json!({ "type": "object" }),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Set the output schema
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = schema;
        self
    }

    /// Set the completion budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Compile the output schema
    pub fn compile_schema(&self) -> Result<JSONSchema, String> {
        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&self.output_schema)
            .map_err(|e| e.to_string())
    }

    /// Render the user prompt for the given context.
    ///
    /// Substitution is single-pass, so placeholder-looking text inside an
    /// upstream payload is never expanded.
    pub fn render(&self, context: &StepContext) -> String {
        let template = self.template.as_str();
        let mut rendered = String::with_capacity(template.len() * 2);
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let substitution = after.find('}').and_then(|close| {
                let name = &after[..close];
                Self::placeholder_value(name, context).map(|value| (value, close))
            });

            match substitution {
                Some((value, close)) => {
                    rendered.push_str(&value);
                    rest = &after[close + 1..];
                }
                None => {
                    rendered.push('{');
                    rest = after;
                }
            }
        }
        rendered.push_str(rest);
        rendered
    }

    fn placeholder_value(name: &str, context: &StepContext) -> Option<String> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }

        match name {
            "context" => Some(pretty(&context.to_value())),
            "run_date" => Some(context.run_date.clone()),
            "sources" => Some(match &context.sources {
                Some(sources) => serde_json::to_string_pretty(sources).unwrap_or_else(|_| "[]".to_string()),
                None => "[]".to_string(),
            }),
            dep => context.dependency(dep).map(pretty),
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Static description of an analysis step
#[derive(Debug, Clone)]
pub struct StepDefinition {
    /// ID of the step
    pub id: StepId,

    /// Human-readable name
    pub name: String,

    /// Steps whose outputs this step consumes, in declaration order
    pub depends_on: Vec<StepId>,

    /// Prompt template and output contract
    pub prompt_contract: PromptContract,

    /// Whether the source collaborator's documents are part of the context
    pub uses_sources: bool,

    /// Soft quality rules applied after schema validation
    pub acceptance_checks: Vec<AcceptanceCheck>,
}

impl StepDefinition {
    /// Create a step with no dependencies
    pub fn new(id: impl Into<StepId>, prompt_contract: PromptContract) -> Self {
        let id = id.into();
        Self {
            name: id.0.clone(),
            id,
            depends_on: Vec::new(),
            prompt_contract,
            uses_sources: false,
            acceptance_checks: Vec::new(),
        }
    }

    /// Set the display name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declare dependencies. Duplicates are ignored.
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StepId>,
    {
        for dep in deps {
            let dep = dep.into();
            if !self.depends_on.contains(&dep) {
                self.depends_on.push(dep);
            }
        }
        self
    }

    /// Feed source documents into this step's context
    pub fn with_sources(mut self) -> Self {
        self.uses_sources = true;
        self
    }

    /// Add a soft acceptance check
    pub fn with_acceptance_check(mut self, check: AcceptanceCheck) -> Self {
        self.acceptance_checks.push(check);
        self
    }

    /// Run every acceptance check and collect the warnings
    pub fn acceptance_warnings(&self, payload: &Value) -> Vec<String> {
        self.acceptance_checks
            .iter()
            .filter_map(|check| check(payload))
            .collect()
    }
}

/// Registry of step definitions.
///
/// Built once at start-up, then shared read-only (behind an `Arc`) with the
/// orchestrator. Declaration order is preserved and breaks ties in the
/// execution order.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    steps: Vec<StepDefinition>,
    index: HashMap<StepId, usize>,
}

impl StepRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step
    pub fn register(&mut self, step: StepDefinition) -> Result<(), CoreError> {
        if self.index.contains_key(&step.id) {
            return Err(CoreError::DuplicateStep(step.id.0.clone()));
        }

        step.prompt_contract
            .compile_schema()
            .map_err(|reason| CoreError::InvalidOutputSchema {
                step: step.id.0.clone(),
                reason,
            })?;

        tracing::debug!(step_id = %step.id, depends_on = ?step.depends_on, "Registered step");
        self.index.insert(step.id.clone(), self.steps.len());
        self.steps.push(step);
        Ok(())
    }

    /// Build a registry from steps, failing on the first duplicate
    pub fn from_steps(steps: impl IntoIterator<Item = StepDefinition>) -> Result<Self, CoreError> {
        let mut registry = Self::new();
        for step in steps {
            registry.register(step)?;
        }
        Ok(registry)
    }

    /// All steps in declaration order
    pub fn all_steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// Look up a step
    pub fn get(&self, id: &StepId) -> Option<&StepDefinition> {
        self.index.get(id).map(|&i| &self.steps[i])
    }

    /// Whether a step id is registered
    pub fn contains(&self, id: &StepId) -> bool {
        self.index.contains_key(id)
    }

    /// Number of registered steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check every dependency resolves and the relation is acyclic
    pub fn validate(&self) -> Result<ExecutionOrder, CoreError> {
        resolve_order(&self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::RunId;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn context_with(deps: Vec<(&str, Value)>) -> StepContext {
        StepContext {
            step_id: StepId::new("target"),
            run_id: RunId("run-1".to_string()),
            run_date: "2026-10-19".to_string(),
            dependencies: deps
                .into_iter()
                .map(|(id, v)| (StepId::new(id), v))
                .collect::<BTreeMap<_, _>>(),
            sources: None,
        }
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = StepRegistry::new();
        registry
            .register(StepDefinition::new("a", PromptContract::new("first")))
            .unwrap();

        let err = registry
            .register(StepDefinition::new("a", PromptContract::new("second")))
            .unwrap_err();

        assert_eq!(err, CoreError::DuplicateStep("a".to_string()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.all_steps()[0].prompt_contract.template, "first");
    }

    #[test]
    fn test_register_rejects_invalid_schema() {
        let step = StepDefinition::new(
            "bad",
            PromptContract::new("x").with_output_schema(json!({ "type": 12 })),
        );

        let err = StepRegistry::new().register(step).unwrap_err();
        assert!(matches!(err, CoreError::InvalidOutputSchema { step, .. } if step == "bad"));
    }

    #[test]
    fn test_all_steps_keeps_declaration_order() {
        let registry = StepRegistry::from_steps(vec![
            StepDefinition::new("c", PromptContract::new("")),
            StepDefinition::new("a", PromptContract::new("")),
            StepDefinition::new("b", PromptContract::new("")),
        ])
        .unwrap();

        let ids: Vec<&str> = registry.all_steps().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert!(registry.contains(&StepId::new("a")));
        assert!(registry.get(&StepId::new("z")).is_none());
    }

    #[test]
    fn test_depends_on_ignores_duplicates() {
        let step = StepDefinition::new("d", PromptContract::new("")).depends_on(["b", "c", "b"]);
        assert_eq!(step.depends_on, vec![StepId::new("b"), StepId::new("c")]);
    }

    #[test]
    fn test_render_substitutes_dependencies_and_date() {
        let contract = PromptContract::new("Date {run_date}. Market: {market_size}. Unknown: {nope}. Brace: {");
        let ctx = context_with(vec![("market_size", json!({"cagr_percent": 12}))]);

        let rendered = contract.render(&ctx);

        assert!(rendered.starts_with("Date 2026-10-19. Market: {"));
        assert!(rendered.contains("\"cagr_percent\": 12"));
        assert!(rendered.contains("Unknown: {nope}."));
        assert!(rendered.ends_with("Brace: {"));
    }

    #[test]
    fn test_render_is_single_pass() {
        let contract = PromptContract::new("{a}");
        let ctx = context_with(vec![("a", json!("{run_date}"))]);

        assert_eq!(contract.render(&ctx), "\"{run_date}\"");
    }

    #[test]
    fn test_acceptance_warnings() {
        fn needs_sources(v: &Value) -> Option<String> {
            match v.get("sources").and_then(Value::as_array) {
                Some(s) if s.len() >= 3 => None,
                _ => Some("fewer than 3 sources".to_string()),
            }
        }

        let step = StepDefinition::new("m", PromptContract::new("")).with_acceptance_check(needs_sources);

        assert_eq!(step.acceptance_warnings(&json!({"sources": [1]})), vec!["fewer than 3 sources"]);
        assert!(step.acceptance_warnings(&json!({"sources": [1, 2, 3]})).is_empty());
    }
}
