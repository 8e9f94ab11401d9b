use crate::domain::collaborators::SourceDocument;
use crate::domain::run::RunId;
use crate::domain::step_definition::StepId;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The input handed to one step invocation.
///
/// Contains exactly the committed payloads of the step's declared
/// dependencies, plus the run's source documents when the step asks for them.
/// Dependencies are keyed in a `BTreeMap` so the serialized context is
/// identical for identical inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepContext {
    /// Step this context was assembled for
    pub step_id: StepId,

    /// Run the step belongs to
    pub run_id: RunId,

    /// Run date, `YYYY-MM-DD`
    pub run_date: String,

    /// Payloads of the declared dependencies
    pub dependencies: BTreeMap<StepId, Value>,

    /// Source documents, present only for steps that use them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceDocument>>,
}

impl StepContext {
    /// Payload of a dependency by id
    pub fn dependency(&self, id: &str) -> Option<&Value> {
        self.dependencies.get(&StepId::new(id))
    }

    /// The context as the JSON object sent alongside the prompt.
    ///
    /// Keys are the dependency ids, plus `sources` when present.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (id, payload) in &self.dependencies {
            map.insert(id.0.clone(), payload.clone());
        }
        if let Some(sources) = &self.sources {
            map.insert(
                "sources".to_string(),
                serde_json::to_value(sources).unwrap_or(Value::Array(Vec::new())),
            );
        }
        Value::Object(map)
    }
}
