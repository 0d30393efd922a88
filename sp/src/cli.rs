//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sp - search prefetch coordinator workbench
#[derive(Parser)]
#[command(
    name = "sp",
    about = "Inspect cache keys and replay search-form scenarios against the prefetch coordinator",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the cache key for a parameter file, or why it would not be prefetched
    Key {
        /// YAML or JSON file holding one search parameter set
        params: PathBuf,
    },

    /// Replay a timed scenario against the simulated executor
    Replay {
        /// YAML scenario file
        scenario: PathBuf,

        /// Override how long to listen after the last step
        #[arg(long)]
        settle_ms: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}
