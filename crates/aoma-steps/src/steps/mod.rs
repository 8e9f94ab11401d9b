//! The ten ADAS analysis steps.
//!
//! Each module exposes the step id, its definition (prompts and output
//! contract) and its acceptance checks.

pub(crate) mod checks;

pub mod bottleneck_diagnosis;
pub mod competitive_landscape;
pub mod compute_architecture;
pub mod gap_analysis;
pub mod market_size;
pub mod pain_point_extraction;
pub mod positioning_messaging;
pub mod source_discovery;
pub mod trends_simplification;
pub mod visualization_reporting;

use aoma_core::{CoreError, PromptContract, StepDefinition, StepRegistry};
use serde_json::{json, Value};

/// Instruction appended to every system prompt
pub(crate) const JSON_ONLY: &str = "Respond with a single JSON object in exactly the output format above. \
Mark anything you cannot verify as \"Unknown\" instead of estimating it.";

/// Schema fragment for the confidence field every step reports
pub(crate) fn confidence_schema() -> Value {
    json!({ "type": "string", "enum": ["High", "Medium", "Low"] })
}

/// Object schema with the given required fields and property schemas.
///
/// `confidence` is always required.
pub(crate) fn object_schema(required: &[&str], properties: Value) -> Value {
    let mut properties = properties;
    if let Some(map) = properties.as_object_mut() {
        map.insert("confidence".to_string(), confidence_schema());
        map.entry("confidence_rationale").or_insert(json!({ "type": "string" }));
    }

    let mut required: Vec<&str> = required.to_vec();
    required.push("confidence");

    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": required,
        "properties": properties,
    })
}

/// Prompt contract from a system prompt, template and output schema
pub(crate) fn contract(system_prompt: &str, template: &str, schema: Value) -> PromptContract {
    PromptContract::new(template)
        .with_system_prompt(format!("{}\n\n{}", system_prompt.trim(), JSON_ONLY))
        .with_output_schema(schema)
}

/// Every step definition, in declaration order
pub fn all_steps() -> Vec<StepDefinition> {
    vec![
        source_discovery::definition(),
        market_size::definition(),
        trends_simplification::definition(),
        competitive_landscape::definition(),
        pain_point_extraction::definition(),
        compute_architecture::definition(),
        bottleneck_diagnosis::definition(),
        gap_analysis::definition(),
        positioning_messaging::definition(),
        visualization_reporting::definition(),
    ]
}

/// The production registry of the ADAS pipeline
pub fn adas_registry() -> Result<StepRegistry, CoreError> {
    let registry = StepRegistry::from_steps(all_steps())?;
    registry.validate()?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aoma_core::StepId;

    #[test]
    fn test_registry_order_matches_data_flow() {
        let registry = adas_registry().unwrap();
        let order: Vec<String> = registry.validate().unwrap().into_iter().map(|id| id.0).collect();

        assert_eq!(
            order,
            vec![
                "source_discovery",
                "market_size",
                "trends_simplification",
                "competitive_landscape",
                "pain_point_extraction",
                "compute_architecture",
                "bottleneck_diagnosis",
                "gap_analysis",
                "positioning_messaging",
                "visualization_reporting",
            ]
        );
    }

    #[test]
    fn test_visualization_depends_on_every_other_step() {
        let registry = adas_registry().unwrap();
        let viz = registry.get(&StepId::new(visualization_reporting::ID)).unwrap();
        assert_eq!(viz.depends_on.len(), 9);
    }

    #[test]
    fn test_only_source_discovery_uses_sources() {
        let users: Vec<String> = all_steps()
            .into_iter()
            .filter(|s| s.uses_sources)
            .map(|s| s.id.0)
            .collect();
        assert_eq!(users, vec![source_discovery::ID]);
    }

    #[test]
    fn test_every_schema_requires_confidence() {
        for step in all_steps() {
            let required = step.prompt_contract.output_schema["required"].as_array().unwrap().clone();
            assert!(required.contains(&json!("confidence")), "{} lacks confidence", step.id);
            assert!(step.prompt_contract.system_prompt.ends_with(JSON_ONLY));
        }
    }
}
