//! Source screening and source providers.

pub mod policy;
pub mod providers;

pub use policy::{SourceCategory, SourceClassification, SourcePolicy};
pub use providers::{FileSourceProvider, PolicyFilteredSources};
