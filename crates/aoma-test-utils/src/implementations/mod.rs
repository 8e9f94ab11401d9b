//! Test implementations (fakes) of the AOMA collaborator interfaces.

mod recording_renderer;
mod scripted_reasoning;
mod static_sources;

pub use recording_renderer::*;
pub use scripted_reasoning::*;
pub use static_sources::*;
