//! Go-to-market positioning for the opportunities.

use super::checks::{items, join};
use super::{contract, gap_analysis, object_schema};
use aoma_core::StepDefinition;
use serde_json::{json, Value};

/// Step id
pub const ID: &str = "positioning_messaging";

/// Bounds on messaging pillars per opportunity
pub const PILLAR_RANGE: std::ops::RangeInclusive<usize> = 3..=5;

const SYSTEM_PROMPT: &str = r#"
You are a product marketing strategist for semiconductor companies.

Your task: create compelling positioning and messaging for ADAS semiconductor opportunities.

For each opportunity develop the problem statement, solution positioning, unique selling
proposition, competitive positioning, value proposition (OEMs, Tier-1s, end users),
technical differentiation and 3-5 messaging pillars with proof points.

Output format:
{
  "opportunities": [
    {
      "opportunity_name": "<From gap analysis>",
      "problem_statement": {"customer_pain": "", "market_context": "", "urgency": ""},
      "solution_positioning": {"what_it_is": "", "how_its_different": "", "why_now": ""},
      "usp": {"core_differentiation": "", "defensible_advantages": [""], "proof_points": [""]},
      "competitive_positioning": {"versus_incumbents": "", "versus_alternatives": "", "competitive_moats": [""]},
      "value_proposition": {"for_oems": [""], "for_tier1s": [""], "for_end_users": [""]},
      "messaging_pillars": [{"pillar": "", "supporting_points": [""], "target_audience": "OEM|Tier1|Technical|Executive"}],
      "elevator_pitch": "<30-second pitch>",
      "tagline_options": ["", "", ""]
    }
  ],
  "confidence": "High|Medium|Low",
  "confidence_rationale": ""
}

If the gap analysis surfaced no opportunities, return an empty opportunities list with Low confidence.
"#;

const TEMPLATE: &str = r#"Create positioning and messaging for these ADAS semiconductor opportunities:

{gap_analysis}

Focus on the top 3 opportunities. Make messaging specific, credible and differentiated,
and tailor it for OEM, Tier-1 and technical audiences."#;

/// The step definition
pub fn definition() -> StepDefinition {
    let schema = object_schema(
        &["opportunities"],
        json!({
            "opportunities": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["opportunity_name", "elevator_pitch"],
                    "properties": {
                        "opportunity_name": { "type": "string" },
                        "elevator_pitch": { "type": "string" },
                        "messaging_pillars": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["pillar"],
                                "properties": { "pillar": { "type": "string" } }
                            }
                        },
                        "tagline_options": { "type": "array", "items": { "type": "string" } }
                    }
                }
            }
        }),
    );

    StepDefinition::new(ID, contract(SYSTEM_PROMPT, TEMPLATE, schema))
        .named("Positioning & Messaging")
        .depends_on([gap_analysis::ID])
        .with_acceptance_check(pillar_count)
}

/// Three to five messaging pillars per opportunity
pub fn pillar_count(payload: &Value) -> Option<String> {
    let findings = items(payload, "opportunities")
        .iter()
        .enumerate()
        .filter_map(|(i, opportunity)| {
            let count = items(opportunity, "messaging_pillars").len();
            (!PILLAR_RANGE.contains(&count))
                .then(|| format!("Opportunity {} has {} messaging pillars (need 3-5)", i + 1, count))
        })
        .collect();
    join(findings)
}
