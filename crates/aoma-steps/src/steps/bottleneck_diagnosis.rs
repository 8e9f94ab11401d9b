//! Technical bottlenecks and their root causes.

use super::checks::items_have;
use super::{competitive_landscape, compute_architecture, contract, object_schema, pain_point_extraction};
use aoma_core::StepDefinition;
use serde_json::{json, Value};

/// Step id
pub const ID: &str = "bottleneck_diagnosis";

const SYSTEM_PROMPT: &str = r#"
You are a systems engineer specializing in automotive semiconductor debugging.

Your task: identify technical bottlenecks in current ADAS semiconductor solutions.

Bottleneck categories: compute/performance, power/thermal, memory/bandwidth,
integration/system, cost/economics.

For each bottleneck give its name and category, root cause, impact on system performance,
why current solutions fail to address it, difficulty of solving and potential approaches.

Output format:
{
  "bottlenecks": [
    {
      "name": "",
      "category": "compute|power|memory|integration|cost",
      "severity": "Critical|High|Medium|Low",
      "description": "",
      "root_cause": "",
      "impact": "",
      "affected_workloads": [""],
      "why_current_solutions_fail": "",
      "difficulty_to_solve": {"technical": "High|Medium|Low", "economic": "High|Medium|Low", "time_to_solution": ""},
      "potential_approaches": [""],
      "evidence": {"source": "", "supporting_data": ""}
    }
  ],
  "critical_path_bottlenecks": [""],
  "quick_wins": [""],
  "long_term_challenges": [""],
  "confidence": "High|Medium|Low",
  "confidence_rationale": ""
}
"#;

const TEMPLATE: &str = r#"Diagnose technical bottlenecks in US ADAS semiconductor solutions.

Competitive landscape:
{competitive_landscape}

Known pain points:
{pain_point_extraction}

Ideal requirements:
{compute_architecture}

Focus on bottlenecks preventing the L2+ to L3 transition, camera/radar processing limits,
AI inference efficiency gaps, power/thermal constraints and cost barriers.
Identify root causes and explain why current approaches fall short."#;

/// The step definition
pub fn definition() -> StepDefinition {
    let schema = object_schema(
        &["bottlenecks"],
        json!({
            "bottlenecks": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "category", "severity"],
                    "properties": {
                        "name": { "type": "string" },
                        "category": { "type": "string", "enum": ["compute", "power", "memory", "integration", "cost"] },
                        "severity": { "type": "string", "enum": ["Critical", "High", "Medium", "Low"] },
                        "root_cause": { "type": "string" },
                        "why_current_solutions_fail": { "type": "string" }
                    }
                }
            },
            "critical_path_bottlenecks": { "type": "array", "items": { "type": "string" } },
            "quick_wins": { "type": "array", "items": { "type": "string" } },
            "long_term_challenges": { "type": "array", "items": { "type": "string" } }
        }),
    );

    StepDefinition::new(ID, contract(SYSTEM_PROMPT, TEMPLATE, schema))
        .named("Bottleneck Diagnosis")
        .depends_on([competitive_landscape::ID, pain_point_extraction::ID, compute_architecture::ID])
        .with_acceptance_check(root_causes_explained)
}

/// Every bottleneck has a root cause and explains why current solutions fail
pub fn root_causes_explained(payload: &Value) -> Option<String> {
    items_have(
        payload,
        "bottlenecks",
        "Bottleneck",
        &[
            ("root_cause", "root cause analysis"),
            ("why_current_solutions_fail", "failure explanation"),
        ],
    )
}
