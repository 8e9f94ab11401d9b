//! Ideal compute requirements per ADAS workload.

use super::checks::{has_content, join};
use super::{contract, object_schema, pain_point_extraction, trends_simplification};
use aoma_core::StepDefinition;
use serde_json::{json, Value};

/// Step id
pub const ID: &str = "compute_architecture";

/// Workload sections of the output
pub const WORKLOADS: [&str; 4] = ["camera_processing", "radar_processing", "sensor_fusion", "ai_ml_inference"];

const SYSTEM_PROMPT: &str = r#"
You are a semiconductor architect specializing in automotive ADAS systems.

Your task: define ideal processing requirements for ADAS workloads.

Analyze:
1. Camera processing: resolution, frame rate, pipeline, TOPS, memory bandwidth, power budget
2. Radar processing: FFT and beamforming, point cloud processing, compute, latency targets
3. Sensor fusion: multi-sensor integration, real-time needs, compute and memory
4. AI/ML inference: network types, precision (INT8, FP16), model size, latency, TOPS/W

Output format:
{
  "camera_processing": {"target_resolution": "", "frame_rate_fps": <number>, "compute_tops": "<range>", "memory_bandwidth_gbps": "<range>", "power_budget_w": "<range>", "key_algorithms": [""]},
  "radar_processing": {"frequency_band": "", "processing_requirements": [""], "compute_tops": "<range>", "latency_target_ms": "<range>", "power_budget_w": "<range>"},
  "sensor_fusion": {"input_sources": [""], "fusion_approach": "centralized|distributed", "compute_tops": "<range>", "memory_gb": "<range>", "power_budget_w": "<range>"},
  "ai_ml_inference": {"target_models": [""], "precision_requirements": [""], "inference_latency_ms": "", "compute_tops": "<range>", "power_efficiency_tops_per_watt": ""},
  "architecture_recommendations": {"preferred_approach": "", "key_trade_offs": [""], "critical_bottlenecks": [""]},
  "confidence": "High|Medium|Low",
  "confidence_rationale": ""
}
"#;

const TEMPLATE: &str = r#"Define ideal processing requirements for US ADAS semiconductors.

Trends:
{trends_simplification}

Pain points:
{pain_point_extraction}

Focus on L2+ and L3 requirements: multi-camera systems (4-8 cameras), long and short range radar,
centralized or domain-based compute, real-time AI inference.
Provide realistic, achievable requirements based on current technology."#;

/// The step definition
pub fn definition() -> StepDefinition {
    let workload = json!({
        "type": "object",
        "properties": {
            "compute_tops": { "type": ["string", "number"] },
            "power_budget_w": { "type": ["string", "number"] }
        }
    });

    let schema = object_schema(
        &[
            "camera_processing",
            "radar_processing",
            "sensor_fusion",
            "ai_ml_inference",
            "architecture_recommendations",
        ],
        json!({
            "camera_processing": workload,
            "radar_processing": workload,
            "sensor_fusion": workload,
            "ai_ml_inference": workload,
            "architecture_recommendations": {
                "type": "object",
                "properties": {
                    "preferred_approach": { "type": "string" },
                    "key_trade_offs": { "type": "array", "items": { "type": "string" } }
                }
            }
        }),
    );

    StepDefinition::new(ID, contract(SYSTEM_PROMPT, TEMPLATE, schema))
        .named("Compute & Architecture")
        .depends_on([trends_simplification::ID, pain_point_extraction::ID])
        .with_acceptance_check(workloads_sized)
}

/// Every workload states its compute requirement
pub fn workloads_sized(payload: &Value) -> Option<String> {
    let findings = WORKLOADS
        .iter()
        .filter(|w| !payload.get(**w).map(|v| has_content(v, "compute_tops")).unwrap_or(false))
        .map(|w| format!("{} missing compute_tops", w))
        .collect();
    join(findings)
}
