//! Key trends in plain language with their silicon implications.

use super::checks::{items, items_have, join};
use super::{contract, market_size, object_schema};
use aoma_core::StepDefinition;
use serde_json::{json, Value};

/// Step id
pub const ID: &str = "trends_simplification";

const SYSTEM_PROMPT: &str = r#"
You are a technical translator specializing in automotive semiconductors.

Your task: identify key trends in US ADAS and translate them into clear, jargon-free language.

Requirements:
1. Identify 5-7 major trends
2. Explain each in plain language (no unexplained acronyms)
3. Connect each trend to its silicon/semiconductor implication
4. Provide evidence (papers, OEM statements or research notes)

Trend categories to consider: sensor evolution, centralized vs distributed processing,
AI/ML integration, power efficiency, functional safety, cost pressure, regulation.

Output format:
{
  "trends": [
    {
      "name": "<Descriptive name>",
      "description": "<Plain language explanation>",
      "silicon_implication": "<One-line impact on semiconductor needs>",
      "evidence": {"type": "paper|oem_statement|research_note", "source": "", "url": "", "key_quote": ""},
      "timeline": "current|1-3 years|3-5 years"
    }
  ],
  "acronyms_defined": {"<ACRONYM>": "<Definition>"},
  "confidence": "High|Medium|Low",
  "confidence_rationale": ""
}
"#;

const TEMPLATE: &str = r#"Identify and explain key trends in US ADAS semiconductors.

Market context from the market sizing step:
{market_size}

Key segments: camera, radar, sensor fusion/compute.
Focus on trends that will drive semiconductor innovation and market opportunities."#;

/// Bounds on the number of trends
pub const TREND_RANGE: std::ops::RangeInclusive<usize> = 5..=7;

/// The step definition
pub fn definition() -> StepDefinition {
    let schema = object_schema(
        &["trends"],
        json!({
            "trends": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "description", "silicon_implication"],
                    "properties": {
                        "name": { "type": "string" },
                        "description": { "type": "string" },
                        "silicon_implication": { "type": "string" },
                        "evidence": { "type": "object" },
                        "timeline": { "type": "string" }
                    }
                }
            },
            "acronyms_defined": { "type": "object" }
        }),
    );

    StepDefinition::new(ID, contract(SYSTEM_PROMPT, TEMPLATE, schema))
        .named("Trends & Simplification")
        .depends_on([market_size::ID])
        .with_acceptance_check(trend_count)
        .with_acceptance_check(trends_are_grounded)
        .with_acceptance_check(acronyms_defined)
}

/// Five to seven trends
pub fn trend_count(payload: &Value) -> Option<String> {
    let count = items(payload, "trends").len();
    (!TREND_RANGE.contains(&count)).then(|| format!("Need 5-7 trends, got {}", count))
}

/// Every trend carries evidence and a silicon implication
pub fn trends_are_grounded(payload: &Value) -> Option<String> {
    items_have(
        payload,
        "trends",
        "Trend",
        &[("silicon_implication", "silicon implication"), ("evidence", "evidence")],
    )
}

/// Acronyms used are defined
pub fn acronyms_defined(payload: &Value) -> Option<String> {
    let defined = payload
        .get("acronyms_defined")
        .and_then(Value::as_object)
        .map(|m| !m.is_empty())
        .unwrap_or(false);
    join(if defined {
        Vec::new()
    } else {
        vec!["No acronyms defined (may be acceptable if none used)".to_string()]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trends(n: usize) -> Value {
        let list: Vec<Value> = (0..n)
            .map(|i| json!({"name": format!("t{}", i), "silicon_implication": "more TOPS", "evidence": {"source": "IEEE"}}))
            .collect();
        json!({ "trends": list, "acronyms_defined": {"TOPS": "Tera operations per second"} })
    }

    #[test]
    fn test_trend_count_bounds() {
        assert_eq!(trend_count(&trends(4)).unwrap(), "Need 5-7 trends, got 4");
        assert!(trend_count(&trends(5)).is_none());
        assert!(trend_count(&trends(7)).is_none());
        assert_eq!(trend_count(&trends(8)).unwrap(), "Need 5-7 trends, got 8");
    }

    #[test]
    fn test_grounding() {
        assert!(trends_are_grounded(&trends(5)).is_none());
        let payload = json!({"trends": [{"name": "x", "silicon_implication": ""}]});
        assert_eq!(
            trends_are_grounded(&payload).unwrap(),
            "Trend 1 missing silicon implication; Trend 1 missing evidence"
        );
    }

    #[test]
    fn test_acronyms() {
        assert!(acronyms_defined(&trends(5)).is_none());
        assert!(acronyms_defined(&json!({"acronyms_defined": {}})).is_some());
    }
}
