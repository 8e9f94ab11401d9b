//! End-to-end scenarios across the AOMA crates.

mod anthropic_pipeline;
mod file_pipeline;
mod persistence;
