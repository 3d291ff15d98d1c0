//! Biosync CLI Library
//!
//! Operator command line for the biosync server: trigger sync runs,
//! inspect source connectivity, and read run history over the HTTP API.

pub mod api;
pub mod commands;
pub mod error;

pub use error::{CliError, Result};

use clap::{Parser, Subcommand};

/// Operator CLI for the biosync server
#[derive(Debug, Parser)]
#[command(name = "biosync", version, about = "Synchronize BioTrack databases into the central store")]
pub struct Cli {
    /// Server base URL
    #[arg(
        long,
        global = true,
        env = "BIOSYNC_SERVER_URL",
        default_value = "http://127.0.0.1:8000"
    )]
    pub server: String,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Trigger a sync run
    Sync {
        /// Source database configuration id
        #[arg(long)]
        database_id: String,

        /// Tables to sync (comma-separated); defaults to all
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,

        /// Run a full sync instead of incremental
        #[arg(long)]
        full: bool,
    },

    /// Show source connectivity and table counts
    Status {
        /// Source database configuration id
        #[arg(long)]
        database_id: String,
    },

    /// Show persisted sync run history
    History {
        /// Filter by source database configuration id
        #[arg(long)]
        database_id: Option<String>,

        /// Maximum number of runs to show
        #[arg(long)]
        limit: Option<i64>,
    },
}
