//! Top three product opportunities.

use super::checks::{items, items_have, join};
use super::{
    bottleneck_diagnosis, competitive_landscape, contract, market_size, object_schema, pain_point_extraction,
    trends_simplification,
};
use aoma_core::StepDefinition;
use serde_json::{json, Value};

/// Step id
pub const ID: &str = "gap_analysis";

/// Number of opportunities the step must surface
pub const OPPORTUNITY_COUNT: usize = 3;

const RANGE_FIELDS: [&str; 2] = ["time_to_market_months_range", "development_cost_range_usd_millions"];

const SYSTEM_PROMPT: &str = r#"
You are a product strategy expert specializing in semiconductor opportunities.

Your task: identify the top 3 ASIC/semiconductor opportunities in the US ADAS market.

For each opportunity analyze the unmet need, target segment, technical gap, proposed ASIC approach,
key differentiators, market size potential, time to execute, development cost vs ROI and the
best-positioned innovators.

Requirements:
- Every opportunity must address a clear, validated unmet need
- Give timelines as ranges ("18-24 months", not "20 months")
- Give cost and ROI as ranges ("$5-8M", not "$6.5M")
- Consider technical feasibility, not just market desire

Output format:
{
  "opportunities": [
    {
      "name": "",
      "rank": 1,
      "unmet_need": "",
      "target_segment": "Camera|Radar|Fusion|AI Compute",
      "technical_gap": "",
      "asic_approach": {"compute_strategy": "", "power_target": "", "integration_level": "", "cost_position": ""},
      "key_differentiators": [""],
      "market_size": {"addressable_market_usd_millions": <number>, "market_share_target_percent": <number>, "revenue_potential_range_usd_millions": "<range>"},
      "execution": {"time_to_market_months_range": "<range>", "development_cost_range_usd_millions": "<range>", "estimated_roi_range": "<range>", "risk_level": "Low|Medium|High"},
      "best_positioned_innovators": [""],
      "supporting_evidence": [{"source": "", "claim": ""}]
    }
  ],
  "assumptions": [{"assumption": "", "risk_if_wrong": "", "validation_signal": ""}],
  "confidence": "High|Medium|Low",
  "confidence_rationale": ""
}
"#;

const TEMPLATE: &str = r#"Identify the top 3 semiconductor opportunities in the US ADAS market.

Market size:
{market_size}

Trends:
{trends_simplification}

Competitive landscape:
{competitive_landscape}

Pain points:
{pain_point_extraction}

Technical bottlenecks:
{bottleneck_diagnosis}

Focus on opportunities where customer pain is validated, the technical gap is clear,
market timing is right and differentiation is defensible."#;

/// The step definition
pub fn definition() -> StepDefinition {
    let schema = object_schema(
        &["opportunities"],
        json!({
            "opportunities": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "rank", "unmet_need"],
                    "properties": {
                        "name": { "type": "string" },
                        "rank": { "type": "integer", "minimum": 1 },
                        "unmet_need": { "type": "string" },
                        "target_segment": { "type": "string" },
                        "execution": { "type": "object" },
                        "market_size": { "type": "object" }
                    }
                }
            },
            "assumptions": { "type": "array" }
        }),
    );

    StepDefinition::new(ID, contract(SYSTEM_PROMPT, TEMPLATE, schema))
        .named("Gap Analysis")
        .depends_on([
            market_size::ID,
            trends_simplification::ID,
            competitive_landscape::ID,
            pain_point_extraction::ID,
            bottleneck_diagnosis::ID,
        ])
        .with_acceptance_check(exactly_three_opportunities)
        .with_acceptance_check(unmet_needs_articulated)
        .with_acceptance_check(estimates_are_ranges)
}

/// Exactly three opportunities
pub fn exactly_three_opportunities(payload: &Value) -> Option<String> {
    let count = items(payload, "opportunities").len();
    (count != OPPORTUNITY_COUNT).then(|| format!("Need exactly 3 opportunities, got {}", count))
}

/// No opportunity without an unmet need
pub fn unmet_needs_articulated(payload: &Value) -> Option<String> {
    items_have(payload, "opportunities", "Opportunity", &[("unmet_need", "unmet need")])
}

/// Timelines and costs are ranges, not point estimates
pub fn estimates_are_ranges(payload: &Value) -> Option<String> {
    let findings = items(payload, "opportunities")
        .iter()
        .enumerate()
        .flat_map(|(i, opportunity)| {
            RANGE_FIELDS.iter().filter_map(move |field| {
                let value = opportunity.get("execution")?.get(*field)?;
                let is_range = value
                    .as_str()
                    .map(|s| s.contains('-') || s.contains(" to "))
                    .unwrap_or(false);
                (!is_range).then(|| format!("Opportunity {} {} is not a range", i + 1, field))
            })
        })
        .collect();
    join(findings)
}
