//! Executive summary and chart data over the whole analysis.

use super::checks::{items, join};
use super::{
    bottleneck_diagnosis, competitive_landscape, compute_architecture, contract, gap_analysis, market_size,
    object_schema, pain_point_extraction, positioning_messaging, source_discovery, trends_simplification,
};
use aoma_core::StepDefinition;
use serde_json::{json, Value};

/// Step id
pub const ID: &str = "visualization_reporting";

/// Maximum number of opportunities in the executive summary
pub const MAX_TOP_OPPORTUNITIES: usize = 3;

const SYSTEM_PROMPT: &str = r#"
You are an executive communications lead for a semiconductor strategy team.

Your task: condense the full ADAS market analysis into an executive summary and the
data needed to chart it.

Output format:
{
  "executive_summary": "<3-5 sentence summary>",
  "key_findings": ["<finding>"],
  "top_opportunities": [{"name": "", "why_it_matters": "", "time_to_market": "<range>"}],
  "charts": [
    {"title": "", "kind": "line|bar|pie|table", "data": {}}
  ],
  "recommended_next_steps": [""],
  "confidence": "High|Medium|Low",
  "confidence_rationale": ""
}

Only restate figures that appear in the analysis below. Do not introduce new numbers.
"#;

const TEMPLATE: &str = r#"Prepare the executive report for the US ADAS semiconductor analysis dated {run_date}.

Complete analysis, keyed by step:
{context}"#;

/// The step definition
pub fn definition() -> StepDefinition {
    let schema = object_schema(
        &["executive_summary", "key_findings", "top_opportunities"],
        json!({
            "executive_summary": { "type": "string" },
            "key_findings": { "type": "array", "items": { "type": "string" } },
            "top_opportunities": { "type": "array", "items": { "type": "object" } },
            "charts": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["title", "kind"],
                    "properties": {
                        "title": { "type": "string" },
                        "kind": { "type": "string", "enum": ["line", "bar", "pie", "table"] }
                    }
                }
            },
            "recommended_next_steps": { "type": "array", "items": { "type": "string" } }
        }),
    );

    StepDefinition::new(ID, contract(SYSTEM_PROMPT, TEMPLATE, schema).with_max_tokens(8192))
        .named("Visualization & Reporting")
        .depends_on([
            source_discovery::ID,
            market_size::ID,
            trends_simplification::ID,
            competitive_landscape::ID,
            pain_point_extraction::ID,
            compute_architecture::ID,
            bottleneck_diagnosis::ID,
            gap_analysis::ID,
            positioning_messaging::ID,
        ])
        .with_acceptance_check(summary_is_substantive)
}

/// Key findings are present and at most three opportunities are highlighted
pub fn summary_is_substantive(payload: &Value) -> Option<String> {
    let mut findings = Vec::new();
    if items(payload, "key_findings").is_empty() {
        findings.push("No key findings".to_string());
    }
    let top = items(payload, "top_opportunities").len();
    if top > MAX_TOP_OPPORTUNITIES {
        findings.push(format!("{} top opportunities (at most 3)", top));
    }
    join(findings)
}
