//! AOMA command-line application.
//!
//! The `aoma` binary triggers full runs, diagnostic single-step runs, run
//! listing and re-rendering. This library holds the pieces so they can be
//! tested without spawning the binary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod cli;
pub mod config;

pub use app::{App, RunOutcome};
pub use cli::{Cli, Command, RunArgs};
pub use config::PipelineConfig;
