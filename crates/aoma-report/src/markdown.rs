//! Markdown rendering of a run report.

use aoma_core::{RunReport, StepResult};
use serde_json::{Map, Value};
use std::fmt::{self, Write};

/// Text shown for steps without a usable payload
pub const DATA_UNAVAILABLE: &str = "data unavailable";

/// Report title
pub const TITLE: &str = "ADAS Semiconductor Opportunity Report";

/// Fields marking a payload as grounded in research sources
const ATTRIBUTION_KEYS: [&str; 3] = ["source", "sources", "evidence"];

/// Top-level fields rendered in the section header instead of the body
const HEADER_KEYS: [&str; 2] = ["confidence", "confidence_rationale"];

/// Fields used as the bullet head of an object inside a list
const HEAD_KEYS: [&str; 3] = ["name", "title", "trend"];

/// Where the content of a section comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution {
    /// The payload cites sources or evidence
    ResearchSources,
    /// The payload was synthesized by the model
    AiSynthesized,
}

impl Attribution {
    /// Attribution of a step payload
    pub fn of(payload: &Value) -> Self {
        let Value::Object(map) = payload else {
            return Attribution::AiSynthesized;
        };

        let in_items = map.values().any(|v| match v {
            Value::Array(items) => items.iter().any(|i| matches!(i, Value::Object(m) if cites(m))),
            _ => false,
        });

        if cites(map) || in_items {
            Attribution::ResearchSources
        } else {
            Attribution::AiSynthesized
        }
    }

    /// Badge text
    pub fn label(&self) -> &'static str {
        match self {
            Attribution::ResearchSources => "From Research Sources",
            Attribution::AiSynthesized => "AI-synthesized",
        }
    }
}

fn cites(map: &Map<String, Value>) -> bool {
    ATTRIBUTION_KEYS.iter().any(|k| map.contains_key(*k))
}

/// Render the whole report
pub fn render_markdown(report: &RunReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &RunReport) -> fmt::Result {
    let ok = report.completed_steps.values().filter(|r| r.is_ok()).count();

    writeln!(out, "# {}", TITLE)?;
    writeln!(out)?;
    writeln!(out, "| | |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| Run | `{}` |", report.run_id)?;
    writeln!(out, "| Status | {} |", report.status)?;
    writeln!(out, "| Started | {} |", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    match report.finished_at {
        Some(at) => writeln!(out, "| Finished | {} |", at.format("%Y-%m-%d %H:%M:%S UTC"))?,
        None => writeln!(out, "| Finished | - |")?,
    }
    writeln!(out, "| Steps ok | {} / {} |", ok, report.step_order.len())?;
    writeln!(out, "| Source documents | {} |", report.source_documents.len())?;
    writeln!(out)?;

    if report.cancelled {
        writeln!(out, "> The run was cancelled before every step executed.")?;
        writeln!(out)?;
    }

    for (index, (id, result)) in report.ordered_results().enumerate() {
        writeln!(out, "## {}. {}", index + 1, report.step_name(id))?;
        writeln!(out)?;
        match result {
            Some(result) if result.is_ok() => write_step(out, result)?,
            Some(result) => {
                let reason = result.error.as_deref().unwrap_or("unknown error");
                writeln!(out, "_{}_ ({})", DATA_UNAVAILABLE, reason)?;
            }
            None => writeln!(out, "_{}_ (no result)", DATA_UNAVAILABLE)?,
        }
        writeln!(out)?;
    }

    Ok(())
}

fn write_step(out: &mut String, result: &StepResult) -> fmt::Result {
    writeln!(out, "_{}_", Attribution::of(&result.payload).label())?;
    writeln!(out)?;

    if let Some(confidence) = result.payload.get("confidence").and_then(Value::as_str) {
        match result.payload.get("confidence_rationale").and_then(Value::as_str) {
            Some(rationale) => writeln!(out, "**Confidence:** {} ({})", confidence, rationale)?,
            None => writeln!(out, "**Confidence:** {}", confidence)?,
        }
        writeln!(out)?;
    }

    if !result.validation_warnings.is_empty() {
        writeln!(out, "**Warnings:**")?;
        for warning in &result.validation_warnings {
            writeln!(out, "- {}", warning)?;
        }
        writeln!(out)?;
    }

    match &result.payload {
        Value::Object(map) => {
            for (key, value) in map.iter().filter(|(k, _)| !HEADER_KEYS.contains(&k.as_str())) {
                write_entry(out, Some(key), value, 0)?;
            }
            Ok(())
        }
        other => write_entry(out, None, other, 0),
    }
}

fn write_entry(out: &mut String, key: Option<&str>, value: &Value, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    let label = key.map(|k| format!("**{}**: ", k.replace('_', " "))).unwrap_or_default();

    match value {
        Value::Array(items) if items.is_empty() => writeln!(out, "{}- {}none", indent, label),
        Value::Array(items) => {
            writeln!(out, "{}- {}", indent, label.trim_end())?;
            for item in items {
                write_entry(out, None, item, depth + 1)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            let head = HEAD_KEYS
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str).map(|v| (*k, v)));
            match head {
                Some((_, text)) => writeln!(out, "{}- {}**{}**", indent, label, text)?,
                None => writeln!(out, "{}- {}", indent, label.trim_end())?,
            }
            for (k, v) in map {
                if head.map(|(head_key, _)| head_key) == Some(k.as_str()) {
                    continue;
                }
                write_entry(out, Some(k), v, depth + 1)?;
            }
            Ok(())
        }
        scalar => writeln!(out, "{}- {}{}", indent, label, scalar_text(scalar)),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "n/a".to_string(),
        other => other.to_string(),
    }
}
