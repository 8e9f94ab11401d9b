//! Source discovery: credible sources for the analysis.

use super::checks::{items, join};
use super::{contract, object_schema};
use aoma_core::StepDefinition;
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Step id
pub const ID: &str = "source_discovery";

const SYSTEM_PROMPT: &str = r#"
You are a research librarian specializing in automotive semiconductors.

Your task: identify the most credible and relevant sources for ADAS semiconductor market analysis.

Source categories:
1. Academic (IEEE, arXiv, ACM, SAE papers)
2. Financial research (JP Morgan, Goldman Sachs, Morgan Stanley reports)
3. Industry (OEM press releases, Tier-1 reports, semiconductor vendor whitepapers)
4. Standards bodies (SAE, ISO)

Output format:
{
  "sources": [
    {
      "name": "<Source name>",
      "category": "academic|financial|industry|standards",
      "url_pattern": "<Base URL or search pattern>",
      "credibility": "High|Medium",
      "information_type": "<What it covers>",
      "update_frequency": "<How often updated>",
      "access": "public|subscription|mixed",
      "relevant_topics": ["<topic>"],
      "example_searches": ["<search query>"]
    }
  ],
  "source_summary": {
    "total_sources": <number>,
    "by_category": {"academic": <number>, "financial": <number>, "industry": <number>, "standards": <number>}
  },
  "recommended_search_strategy": "<How to use these sources effectively>",
  "confidence": "High|Medium|Low",
  "confidence_rationale": "<Why>"
}
"#;

const TEMPLATE: &str = r#"Identify credible sources for US ADAS semiconductor market analysis as of {run_date}.

Requirements:
1. Cover the academic, financial, industry and standards categories
2. Prefer sources with the highest credibility
3. Include both free and subscription sources
4. Give URL patterns or search strategies
5. Map each source to the analysis topics it serves

Topics: market sizing and forecasts, camera processing, radar processing, sensor fusion and AI compute,
competitive landscape, technical specifications, OEM adoption.

Pre-screened documents gathered for this run (may be empty):
{sources}"#;

const EXPECTED_CATEGORIES: [&str; 3] = ["academic", "financial", "industry"];

/// The step definition
pub fn definition() -> StepDefinition {
    let schema = object_schema(
        &["sources", "source_summary"],
        json!({
            "sources": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "required": ["name", "category", "credibility"],
                    "properties": {
                        "name": { "type": "string" },
                        "category": { "type": "string", "enum": ["academic", "financial", "industry", "standards"] },
                        "url_pattern": { "type": "string" },
                        "credibility": { "type": "string", "enum": ["High", "Medium"] },
                        "access": { "type": "string" },
                        "relevant_topics": { "type": "array", "items": { "type": "string" } }
                    }
                }
            },
            "source_summary": { "type": "object" },
            "recommended_search_strategy": { "type": "string" }
        }),
    );

    StepDefinition::new(ID, contract(SYSTEM_PROMPT, TEMPLATE, schema))
        .named("Source Discovery")
        .with_sources()
        .with_acceptance_check(covers_expected_categories)
}

/// The academic, financial and industry categories must all be represented
pub fn covers_expected_categories(payload: &Value) -> Option<String> {
    let present: BTreeSet<&str> = items(payload, "sources")
        .iter()
        .filter_map(|s| s.get("category").and_then(Value::as_str))
        .collect();

    let missing: Vec<String> = EXPECTED_CATEGORIES
        .iter()
        .filter(|c| !present.contains(*c))
        .map(|c| c.to_string())
        .collect();

    join(if missing.is_empty() {
        Vec::new()
    } else {
        vec![format!("Missing source categories: {}", missing.join(", "))]
    })
}
