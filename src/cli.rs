use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Hierarchical task list with derived durations and progress rollup.
/// Data lives in ~/.phased-tasks unless --data-dir says otherwise.
#[derive(Parser)]
#[command(name = "pt", version, about = "Hierarchical task list")]
pub struct Cli {
    /// Directory holding the task data and config.toml.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
