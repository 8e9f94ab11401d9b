/// Context assembly for a single step
pub mod context_assembler;

/// Step execution with retries and output validation
pub mod step_executor;

/// Run orchestration
pub mod run_orchestrator;
