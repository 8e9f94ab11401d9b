//! Environment setup builders for testing the AOMA pipeline.
//!
//! This module provides step helpers and a builder that wires an
//! orchestrator to scripted collaborators.

mod pipeline;

// Re-export all builders for easy access
pub use pipeline::*;
