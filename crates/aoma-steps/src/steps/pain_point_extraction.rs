//! Customer pain points across the ecosystem.

use super::checks::items_have;
use super::{contract, object_schema, trends_simplification};
use aoma_core::StepDefinition;
use serde_json::{json, Value};

/// Step id
pub const ID: &str = "pain_point_extraction";

const SYSTEM_PROMPT: &str = r#"
You are a customer insights analyst for automotive semiconductors.

Your task: identify and categorize pain points in the ADAS semiconductor ecosystem.

Pain point categories:
1. Technical (performance, power, integration)
2. Business (cost, time-to-market, supply chain)
3. Operational (support, tools, documentation)
4. Strategic (future-proofing, scalability, vendor lock-in)

For each pain point identify who experiences it (OEMs, Tier-1s, silicon vendors), what the pain is,
why it matters and the supporting evidence.

Output format:
{
  "pain_points": [
    {
      "category": "Technical|Business|Operational|Strategic",
      "title": "<Short description>",
      "description": "<Detailed explanation>",
      "impacted_stakeholders": ["OEM|Tier1|SiliconVendor"],
      "severity": "High|Medium|Low",
      "impact": "<Business impact>",
      "current_workarounds": [""],
      "evidence": {"source_type": "academic|financial|industry|oem_statement", "source_name": "", "url": "", "key_quote": ""}
    }
  ],
  "summary": {"total_pain_points": <number>, "top_3_critical": ["", "", ""]},
  "confidence": "High|Medium|Low",
  "confidence_rationale": ""
}
"#;

const TEMPLATE: &str = r#"Identify pain points in the US ADAS semiconductor market.

Trends from the previous analysis:
{trends_simplification}

Focus areas: camera processing, radar processing, sensor fusion complexity, AI/ML compute,
power and thermal constraints, cost pressure, time-to-market, integration difficulty.

Prioritize pain points that are widely experienced, have significant business impact and
currently lack good solutions. Cite evidence and attribute each to a stakeholder type."#;

/// The step definition
pub fn definition() -> StepDefinition {
    let schema = object_schema(
        &["pain_points"],
        json!({
            "pain_points": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["category", "title", "severity"],
                    "properties": {
                        "category": { "type": "string", "enum": ["Technical", "Business", "Operational", "Strategic"] },
                        "title": { "type": "string" },
                        "severity": { "type": "string", "enum": ["High", "Medium", "Low"] },
                        "impacted_stakeholders": { "type": "array", "items": { "type": "string" } },
                        "evidence": { "type": "object" }
                    }
                }
            },
            "summary": { "type": "object" }
        }),
    );

    StepDefinition::new(ID, contract(SYSTEM_PROMPT, TEMPLATE, schema))
        .named("Pain Point Extraction")
        .depends_on([trends_simplification::ID])
        .with_acceptance_check(pain_points_attributed)
}

/// Every pain point cites evidence and names its stakeholders
pub fn pain_points_attributed(payload: &Value) -> Option<String> {
    items_have(
        payload,
        "pain_points",
        "Pain point",
        &[("evidence", "evidence"), ("impacted_stakeholders", "stakeholder attribution")],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribution() {
        let payload = json!({"pain_points": [
            {"title": "a", "evidence": {"source_name": "SAE"}, "impacted_stakeholders": ["OEM"]},
            {"title": "b", "evidence": {"source_name": "SAE"}, "impacted_stakeholders": []}
        ]});
        assert_eq!(
            pain_points_attributed(&payload).unwrap(),
            "Pain point 2 missing stakeholder attribution"
        );
    }
}
