//! Current solutions of the major suppliers.

use super::checks::{items, join};
use super::{contract, object_schema, trends_simplification};
use aoma_core::StepDefinition;
use serde_json::{json, Value};

/// Step id
pub const ID: &str = "competitive_landscape";

/// Minimum share of the top suppliers that must be covered
pub const MIN_COVERAGE_PERCENT: f64 = 80.0;

/// Spec fields that must be given or marked "Unknown"
const SPEC_FIELDS: [&str; 3] = ["process_node", "compute_tops", "power_w"];

const SYSTEM_PROMPT: &str = r#"
You are a competitive intelligence analyst for automotive semiconductors.

Analyze current ADAS semiconductor solutions from the major suppliers, covering
camera processing chips, radar processing chips and sensor fusion / AI compute platforms.

For each solution document the company, product family, process node, compute (TOPS),
power consumption, target ADAS level, known OEM customers and competitive advantages.
Mark every undisclosed spec as "Unknown". Do not infer or estimate.

Output format:
{
  "solutions": [
    {
      "company": "",
      "product": "",
      "segment": "camera|radar|fusion_compute",
      "process_node": "<e.g. 7nm or Unknown>",
      "compute_tops": "<number or Unknown>",
      "power_w": "<number or Unknown>",
      "adas_level": "L1|L2|L2+|L3",
      "oem_customers": [""],
      "advantages": [""]
    }
  ],
  "coverage_percent": <share of top US-relevant suppliers covered>,
  "market_leaders": [""],
  "confidence": "High|Medium|Low",
  "confidence_rationale": ""
}
"#;

const TEMPLATE: &str = r#"Map the competitive landscape of US ADAS semiconductors.

Trends shaping the market:
{trends_simplification}

Cover at least 80% of the top US-relevant suppliers."#;

/// The step definition
pub fn definition() -> StepDefinition {
    let spec_value = json!({ "type": ["string", "number"] });
    let schema = object_schema(
        &["solutions"],
        json!({
            "solutions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["company", "product"],
                    "properties": {
                        "company": { "type": "string" },
                        "product": { "type": "string" },
                        "segment": { "type": "string" },
                        "process_node": spec_value,
                        "compute_tops": spec_value,
                        "power_w": spec_value,
                        "oem_customers": { "type": "array", "items": { "type": "string" } }
                    }
                }
            },
            "coverage_percent": { "type": "number" },
            "market_leaders": { "type": "array", "items": { "type": "string" } }
        }),
    );

    StepDefinition::new(ID, contract(SYSTEM_PROMPT, TEMPLATE, schema))
        .named("Competitive Landscape")
        .depends_on([trends_simplification::ID])
        .with_acceptance_check(supplier_coverage)
        .with_acceptance_check(unknown_specs_marked)
}

/// Reported supplier coverage is at least 80%
pub fn supplier_coverage(payload: &Value) -> Option<String> {
    let coverage = payload.get("coverage_percent").and_then(Value::as_f64)?;
    (coverage < MIN_COVERAGE_PERCENT)
        .then(|| format!("Supplier coverage {:.0}% below {:.0}%", coverage, MIN_COVERAGE_PERCENT))
}

/// Blank specs must be marked "Unknown"
pub fn unknown_specs_marked(payload: &Value) -> Option<String> {
    let findings = items(payload, "solutions")
        .iter()
        .enumerate()
        .flat_map(|(i, solution)| {
            SPEC_FIELDS.iter().filter_map(move |field| {
                let blank = match solution.get(*field) {
                    None | Some(Value::Null) => true,
                    Some(Value::String(s)) => s.trim().is_empty(),
                    Some(_) => false,
                };
                blank.then(|| format!("Solution {} has blank {} (mark as Unknown)", i + 1, field))
            })
        })
        .collect();
    join(findings)
}
