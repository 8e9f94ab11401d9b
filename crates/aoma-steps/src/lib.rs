//! ADAS analysis step library for the AOMA pipeline.
//!
//! Provides the ten production step definitions with their prompt contracts
//! and acceptance checks, the source policy and source providers, and sample
//! outputs for offline runs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod samples;
pub mod sources;
pub mod steps;

pub use samples::{sample_payload, SampleReasoningService};
pub use sources::{
    FileSourceProvider, PolicyFilteredSources, SourceCategory, SourceClassification, SourcePolicy,
};
pub use steps::{adas_registry, all_steps};
