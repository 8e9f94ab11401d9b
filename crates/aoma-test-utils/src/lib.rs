//! Testing utilities for the AOMA pipeline.
//!
//! This crate provides mocks, test implementations (fakes), pipeline
//! builders and assertion helpers shared by the workspace's tests.

pub mod assertions;
pub mod builders;
pub mod implementations;
pub mod mocks;

/// Re-export commonly used types for convenience
pub use mockall;

pub use builders::{diamond_steps, fast_retry_policy, step, TestPipeline, TestPipelineBuilder};
pub use implementations::{RecordingRenderer, ScriptedOutcome, ScriptedReasoningService, StaticSourceProvider};

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_test_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter("debug")
                .finish(),
        );
    });
}
