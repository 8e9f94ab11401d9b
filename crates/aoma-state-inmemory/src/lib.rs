//! In-memory run repository for the AOMA pipeline
//!
//! Useful for development, tests and one-shot invocations where runs do not
//! need to outlive the process.

pub mod repositories;
pub use repositories::InMemoryRunRepository;
