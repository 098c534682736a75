//! CLI argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::adapter::storage::StorageType;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a YAML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario against a fresh actor system and print every outcome
    Run {
        /// Scenario YAML file (runs the built-in approval walk when omitted)
        #[arg(value_name = "SCENARIO")]
        scenario:  Option<PathBuf>,
        /// Storage backend, overriding the configuration file
        #[arg(long, value_enum)]
        storage:   Option<StorageType>,
        /// Stop collecting once no outcome arrived for this many milliseconds
        #[arg(long, default_value_t = 300)]
        settle_ms: u64
    },
    /// Print the employee lifecycle transition table
    Transitions
}
