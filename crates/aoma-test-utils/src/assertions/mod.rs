//! Assertion utilities for validating runs and step results.

mod run_state;

// Re-export all assertion helpers for easy access
pub use run_state::*;
