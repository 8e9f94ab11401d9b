//! Command-line arguments

use aoma_core::ExecutionMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// ADAS opportunity mapping pipeline
#[derive(Parser, Debug)]
#[command(name = "aoma", version, about)]
pub struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, env = "AOMA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Answer every step from the built-in sample outputs instead of calling the API
    #[arg(long, global = true)]
    pub offline: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Run the full pipeline and render the report
    Run(RunArgs),

    /// Run one step together with the steps it depends on
    Step {
        /// Id of the step, see `aoma steps`
        step_id: String,
    },

    /// Print the execution order and dependencies
    Steps,

    /// List persisted runs, newest first
    Runs,

    /// Render the report of a persisted run again
    Render {
        /// Id of the run, see `aoma runs`
        run_id: String,
    },

    /// List archived outputs of earlier runs
    Archives,
}

/// Options of a full run
#[derive(Args, Debug, Default, PartialEq)]
pub struct RunArgs {
    /// Keep the previous reports in place instead of archiving them
    #[arg(long)]
    pub no_archive: bool,

    /// Number of archives to keep, overrides the configuration
    #[arg(long)]
    pub keep_archives: Option<usize>,

    /// Step scheduling: sequential or graph_parallel
    #[arg(long)]
    pub mode: Option<ExecutionMode>,
}
