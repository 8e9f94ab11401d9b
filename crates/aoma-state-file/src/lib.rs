//! File-backed persistence for the AOMA pipeline
//!
//! Runs are stored as JSON under `<outputs>/runs/`, every successful step
//! result is also written to `<outputs>/reports/`, and the outputs of previous
//! runs can be moved to timestamped folders under `<outputs>/archives/`.

#![forbid(unsafe_code)]

pub mod archive;
pub mod layout;
pub mod repository;

pub use archive::{ArchiveError, ArchiveInfo, ArchiveManager};
pub use layout::OutputLayout;
pub use repository::FileRunRepository;
