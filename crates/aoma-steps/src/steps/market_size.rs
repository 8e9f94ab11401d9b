//! Market sizing with sourced forecasts.

use super::checks::{items, join};
use super::{contract, object_schema, source_discovery};
use aoma_core::StepDefinition;
use serde_json::{json, Value};

/// Step id
pub const ID: &str = "market_size";

/// Minimum number of independent sources
pub const MIN_SOURCES: usize = 3;

const SYSTEM_PROMPT: &str = r#"
You are a market analysis expert specializing in automotive semiconductors.

Your task: analyze the US ADAS semiconductor market size with rigorous sourcing.

Requirements:
1. Use at least 3 independent credible sources
2. Extract base year, projection year, CAGR and market size figures
3. Break down by camera, radar and sensor fusion/compute
4. Surface divergent forecasts with explanations
5. Base confidence on how well the sources agree

Allowed sources: financial research (JP Morgan, Goldman Sachs, Morgan Stanley), academic papers
(IEEE, arXiv, ACM, SAE), company financial disclosures and investor presentations.

Output format:
{
  "current_market_size_usd_millions": <number>,
  "base_year": <year>,
  "projected_market_size_usd_millions": <number>,
  "projection_year": <year>,
  "cagr_percent": <number>,
  "breakdown": {
    "camera": {"size_usd_millions": <number>, "percentage": <number>},
    "radar": {"size_usd_millions": <number>, "percentage": <number>},
    "sensor_fusion_compute": {"size_usd_millions": <number>, "percentage": <number>}
  },
  "sources": [{"name": "", "url": "", "figure": "", "year": ""}],
  "divergent_forecasts": [{"source": "", "difference": "", "rationale": ""}],
  "confidence": "High|Medium|Low",
  "confidence_rationale": ""
}
"#;

const TEMPLATE: &str = r#"Analyze the US ADAS semiconductor market size.

Credible sources identified for this analysis:
{source_discovery}

Focus areas:
- Camera processing semiconductors
- Radar processing semiconductors
- Sensor fusion and AI compute chips

Provide comprehensive market sizing with all required fields."#;

/// The step definition
pub fn definition() -> StepDefinition {
    let segment = json!({
        "type": "object",
        "properties": {
            "size_usd_millions": { "type": "number" },
            "percentage": { "type": "number" }
        }
    });

    let schema = object_schema(
        &[
            "current_market_size_usd_millions",
            "base_year",
            "projected_market_size_usd_millions",
            "projection_year",
            "cagr_percent",
            "sources",
        ],
        json!({
            "current_market_size_usd_millions": { "type": "number" },
            "base_year": { "type": "integer" },
            "projected_market_size_usd_millions": { "type": "number" },
            "projection_year": { "type": "integer" },
            "cagr_percent": { "type": "number" },
            "breakdown": {
                "type": "object",
                "properties": {
                    "camera": segment,
                    "radar": segment,
                    "sensor_fusion_compute": segment
                }
            },
            "sources": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name"],
                    "properties": { "name": { "type": "string" }, "url": { "type": "string" } }
                }
            },
            "divergent_forecasts": { "type": "array", "items": { "type": "object" } }
        }),
    );

    StepDefinition::new(ID, contract(SYSTEM_PROMPT, TEMPLATE, schema))
        .named("Market Size")
        .depends_on([source_discovery::ID])
        .with_acceptance_check(enough_sources)
        .with_acceptance_check(projection_follows_base_year)
}

/// At least three independent sources
pub fn enough_sources(payload: &Value) -> Option<String> {
    let count = items(payload, "sources").len();
    (count < MIN_SOURCES).then(|| format!("Only {} sources (need ≥{})", count, MIN_SOURCES))
}

/// The projection year lies after the base year
pub fn projection_follows_base_year(payload: &Value) -> Option<String> {
    let base = payload.get("base_year").and_then(Value::as_i64);
    let projection = payload.get("projection_year").and_then(Value::as_i64);
    join(match (base, projection) {
        (Some(b), Some(p)) if p <= b => vec![format!("Projection year {} does not follow base year {}", p, b)],
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enough_sources() {
        assert_eq!(
            enough_sources(&json!({"sources": [{"name": "a"}, {"name": "b"}]})).unwrap(),
            "Only 2 sources (need ≥3)"
        );
        assert!(enough_sources(&json!({"sources": [{}, {}, {}]})).is_none());
        assert!(enough_sources(&json!({})).is_some());
    }

    #[test]
    fn test_projection_year() {
        assert!(projection_follows_base_year(&json!({"base_year": 2024, "projection_year": 2030})).is_none());
        assert!(projection_follows_base_year(&json!({"base_year": 2030, "projection_year": 2024})).is_some());
        assert!(projection_follows_base_year(&json!({})).is_none());
    }

    #[test]
    fn test_template_references_dependency() {
        let step = definition();
        assert!(step.prompt_contract.template.contains("{source_discovery}"));
        assert_eq!(step.depends_on.len(), 1);
    }
}
