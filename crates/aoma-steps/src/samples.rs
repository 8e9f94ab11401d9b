//! Canned step outputs and an offline reasoning service built on them.
//!
//! Used for dry runs of the pipeline without network access. Every sample
//! satisfies its step's output contract and acceptance checks.

use crate::steps::{
    bottleneck_diagnosis, competitive_landscape, compute_architecture, gap_analysis, market_size,
    pain_point_extraction, positioning_messaging, source_discovery, trends_simplification, visualization_reporting,
};
use aoma_core::{ReasoningRequest, ReasoningResponse, ReasoningService, ServiceError};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

/// Sample output of a step, if one exists
pub fn sample_payload(step_id: &str) -> Option<Value> {
    let payload = match step_id {
        source_discovery::ID => json!({
            "sources": [
                {"name": "IEEE Xplore", "category": "academic", "url_pattern": "ieeexplore.ieee.org", "credibility": "High", "access": "subscription"},
                {"name": "SAE Mobilus", "category": "standards", "url_pattern": "sae.org", "credibility": "High", "access": "subscription"},
                {"name": "Goldman Sachs Research", "category": "financial", "url_pattern": "goldmansachs.com/insights", "credibility": "High", "access": "mixed"},
                {"name": "NXP investor relations", "category": "industry", "url_pattern": "nxp.com/investors", "credibility": "Medium", "access": "public"}
            ],
            "source_summary": {"total_sources": 4, "by_category": {"academic": 1, "financial": 1, "industry": 1, "standards": 1}},
            "recommended_search_strategy": "Start from financial forecasts, then cross-check with vendor disclosures.",
            "confidence": "High",
            "confidence_rationale": "Established, widely cited sources"
        }),
        market_size::ID => json!({
            "current_market_size_usd_millions": 4200.0,
            "base_year": 2024,
            "projected_market_size_usd_millions": 9800.0,
            "projection_year": 2030,
            "cagr_percent": 15.2,
            "breakdown": {
                "camera": {"size_usd_millions": 1700.0, "percentage": 40.5},
                "radar": {"size_usd_millions": 1100.0, "percentage": 26.2},
                "sensor_fusion_compute": {"size_usd_millions": 1400.0, "percentage": 33.3}
            },
            "sources": [
                {"name": "Goldman Sachs ADAS outlook", "url": "https://www.goldmansachs.com/insights"},
                {"name": "Morgan Stanley auto semis note", "url": "https://www.morganstanley.com/ideas"},
                {"name": "IEEE market survey", "url": "https://ieeexplore.ieee.org"}
            ],
            "divergent_forecasts": [{"source": "Morgan Stanley", "difference": "+8%", "rationale": "Faster L2+ adoption"}],
            "confidence": "Medium",
            "confidence_rationale": "Sources agree within 10%"
        }),
        trends_simplification::ID => {
            let trends: Vec<Value> = [
                ("Central compute", "Many small controllers merge into one vehicle computer", "Demand for 100+ TOPS SoCs"),
                ("4D imaging radar", "Radar that also measures height", "Higher-resolution radar DSPs"),
                ("Camera resolution", "8 MP cameras replace 1-2 MP", "More ISP bandwidth"),
                ("Transformer models", "Neural networks that look at the whole scene at once", "Accelerators tuned for attention"),
                ("Functional safety", "Chips must detect their own faults (ASIL-D)", "Lockstep cores and safety islands"),
            ]
            .iter()
            .map(|(name, description, implication)| {
                json!({
                    "name": name,
                    "description": description,
                    "silicon_implication": implication,
                    "evidence": {"type": "research_note", "source": "SAE technical paper"},
                    "timeline": "1-3 years"
                })
            })
            .collect();
            json!({
                "trends": trends,
                "acronyms_defined": {"TOPS": "Tera operations per second", "ISP": "Image signal processor", "ASIL": "Automotive safety integrity level"},
                "confidence": "High",
                "confidence_rationale": "Consistent across OEM statements"
            })
        }
        competitive_landscape::ID => json!({
            "solutions": [
                {"company": "Mobileye", "product": "EyeQ6", "segment": "camera", "process_node": "7nm", "compute_tops": 34, "power_w": "Unknown"},
                {"company": "NVIDIA", "product": "DRIVE Orin", "segment": "fusion_compute", "process_node": "8nm", "compute_tops": 254, "power_w": 45},
                {"company": "Texas Instruments", "product": "AWR2944", "segment": "radar", "process_node": "45nm", "compute_tops": "Unknown", "power_w": "Unknown"},
                {"company": "Qualcomm", "product": "Snapdragon Ride", "segment": "fusion_compute", "process_node": "5nm", "compute_tops": "Unknown", "power_w": "Unknown"}
            ],
            "coverage_percent": 85,
            "market_leaders": ["Mobileye", "NVIDIA"],
            "confidence": "Medium",
            "confidence_rationale": "Power figures mostly undisclosed"
        }),
        pain_point_extraction::ID => json!({
            "pain_points": [
                {
                    "category": "Technical",
                    "title": "Thermal budget in the windshield module",
                    "severity": "High",
                    "impacted_stakeholders": ["OEM", "Tier1"],
                    "evidence": {"source_type": "industry", "source_name": "Tier-1 investor day"}
                },
                {
                    "category": "Business",
                    "title": "Software porting cost across SoC generations",
                    "severity": "Medium",
                    "impacted_stakeholders": ["OEM"],
                    "evidence": {"source_type": "oem_statement", "source_name": "OEM earnings call"}
                }
            ],
            "summary": {"total_pain_points": 2, "top_3_critical": ["Thermal budget in the windshield module"]},
            "confidence": "Medium",
            "confidence_rationale": "Two independent stakeholder types"
        }),
        compute_architecture::ID => json!({
            "camera_processing": {"target_resolution": "8MP", "frame_rate_fps": 30, "compute_tops": "20-50", "power_budget_w": "5-10"},
            "radar_processing": {"frequency_band": "77GHz", "compute_tops": "1-5", "latency_target_ms": "10-20", "power_budget_w": "2-4"},
            "sensor_fusion": {"fusion_approach": "centralized", "compute_tops": "50-100", "memory_gb": "8-16", "power_budget_w": "15-30"},
            "ai_ml_inference": {"precision_requirements": ["INT8", "FP16"], "compute_tops": "100-250", "power_efficiency_tops_per_watt": "5+"},
            "architecture_recommendations": {"preferred_approach": "Zonal sensors with a central compute SoC", "key_trade_offs": ["Cost vs headroom"]},
            "confidence": "Medium",
            "confidence_rationale": "Ranges reflect L2+ to L3 spread"
        }),
        bottleneck_diagnosis::ID => json!({
            "bottlenecks": [
                {
                    "name": "Memory bandwidth for multi-camera inference",
                    "category": "memory",
                    "severity": "Critical",
                    "root_cause": "LPDDR5 bandwidth grows slower than sensor data rates",
                    "why_current_solutions_fail": "General-purpose SoCs share one memory bus across all accelerators"
                },
                {
                    "name": "Radar point-cloud processing latency",
                    "category": "compute",
                    "severity": "High",
                    "root_cause": "Radar DSPs designed for 3D, not 4D, data",
                    "why_current_solutions_fail": "Fixed FFT pipelines cannot scale to more virtual channels"
                }
            ],
            "critical_path_bottlenecks": ["Memory bandwidth for multi-camera inference"],
            "quick_wins": ["On-chip compression"],
            "long_term_challenges": ["Thermal envelope"],
            "confidence": "Medium",
            "confidence_rationale": "Backed by vendor roadmaps"
        }),
        gap_analysis::ID => {
            let opportunities: Vec<Value> = [
                (1, "4D radar front-end ASIC", "Low-cost high-resolution radar processing"),
                (2, "Camera ISP with in-line compression", "Bandwidth relief for 8MP camera clusters"),
                (3, "Safety island companion chip", "ASIL-D monitoring for non-safety SoCs"),
            ]
            .iter()
            .map(|(rank, name, need)| {
                json!({
                    "name": name,
                    "rank": rank,
                    "unmet_need": need,
                    "target_segment": "Radar",
                    "execution": {
                        "time_to_market_months_range": "18-24",
                        "development_cost_range_usd_millions": "15-25",
                        "estimated_roi_range": "3-5x",
                        "risk_level": "Medium"
                    }
                })
            })
            .collect();
            json!({
                "opportunities": opportunities,
                "assumptions": [{"assumption": "L2+ adoption continues", "risk_if_wrong": "Smaller market", "validation_signal": "OEM attach rates"}],
                "confidence": "Medium",
                "confidence_rationale": "Needs customer validation"
            })
        }
        positioning_messaging::ID => {
            let pillars = json!([
                {"pillar": "Sees further", "target_audience": "OEM"},
                {"pillar": "Costs less", "target_audience": "Executive"},
                {"pillar": "Integrates in weeks", "target_audience": "Tier1"}
            ]);
            json!({
                "opportunities": [
                    {"opportunity_name": "4D radar front-end ASIC", "elevator_pitch": "Imaging radar at corner-radar cost.", "messaging_pillars": pillars},
                    {"opportunity_name": "Camera ISP with in-line compression", "elevator_pitch": "Twice the cameras on the same memory.", "messaging_pillars": pillars},
                    {"opportunity_name": "Safety island companion chip", "elevator_pitch": "ASIL-D for any SoC.", "messaging_pillars": pillars}
                ],
                "confidence": "Medium",
                "confidence_rationale": "Messaging untested with customers"
            })
        }
        visualization_reporting::ID => json!({
            "executive_summary": "The US ADAS semiconductor market grows at about 15% a year. Memory bandwidth and radar processing are the main bottlenecks.",
            "key_findings": ["Central compute drives demand for 100+ TOPS", "4D radar creates a new DSP segment"],
            "top_opportunities": [
                {"name": "4D radar front-end ASIC", "time_to_market": "18-24 months"},
                {"name": "Camera ISP with in-line compression", "time_to_market": "18-24 months"},
                {"name": "Safety island companion chip", "time_to_market": "18-24 months"}
            ],
            "charts": [{"title": "Market size", "kind": "line", "data": {"2024": 4200, "2030": 9800}}],
            "recommended_next_steps": ["Validate radar ASIC with two Tier-1s"],
            "confidence": "Medium",
            "confidence_rationale": "Inherits upstream confidence"
        }),
        _ => return None,
    };
    Some(payload)
}

/// Reasoning service answering every call with the step's sample payload
#[derive(Debug, Default, Clone)]
pub struct SampleReasoningService;

impl SampleReasoningService {
    /// Create the service
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReasoningService for SampleReasoningService {
    async fn invoke(&self, request: ReasoningRequest) -> Result<ReasoningResponse, ServiceError> {
        debug!(step_id = %request.step_id, "Answering with sample payload");
        let payload = sample_payload(request.step_id.as_str())
            .ok_or_else(|| ServiceError::Permanent(format!("No sample for step {}", request.step_id)))?;
        let text = serde_json::to_string_pretty(&payload).map_err(|e| ServiceError::Permanent(e.to_string()))?;
        Ok(ReasoningResponse::new(format!("```json\n{}\n```", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::all_steps;

    #[test]
    fn test_every_sample_satisfies_its_contract() {
        for step in all_steps() {
            let payload = sample_payload(step.id.as_str()).unwrap();
            let schema = step.prompt_contract.compile_schema().unwrap();
            if let Err(errors) = schema.validate(&payload) {
                let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
                panic!("{} sample violates schema: {:?}", step.id, messages);
            }
            assert!(
                step.acceptance_warnings(&payload).is_empty(),
                "{} sample has warnings: {:?}",
                step.id,
                step.acceptance_warnings(&payload)
            );
        }
    }

    #[test]
    fn test_unknown_step_has_no_sample() {
        assert!(sample_payload("nope").is_none());
    }

    #[tokio::test]
    async fn test_service_returns_fenced_sample() {
        let request = ReasoningRequest {
            step_id: market_size::ID.into(),
            system_prompt: String::new(),
            prompt: String::new(),
            context: json!({}),
            max_tokens: 100,
            timeout: std::time::Duration::from_secs(1),
        };
        let response = SampleReasoningService::new().invoke(request).await.unwrap();
        let parsed = aoma_core::extract_json(&response.text).unwrap();
        assert_eq!(parsed["base_year"], 2024);
    }
}
