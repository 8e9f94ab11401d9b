//! Markdown rendering of finished AOMA runs.
//!
//! Every step gets a section in execution order. Failed steps show as
//! "data unavailable"; successful ones carry an attribution badge and their
//! confidence.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod markdown;
pub mod renderer;

pub use markdown::{render_markdown, Attribution, DATA_UNAVAILABLE};
pub use renderer::MarkdownReportRenderer;
