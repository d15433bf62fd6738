//! CLI argument definitions using clap
//!
//! Commands:
//! - featurestore query --data <path> [--request <path>] [--config <path>]
//! - featurestore count --data <path> [--request <path>] [--config <path>]
//! - featurestore extent --data <path> [--request <path>] [--config <path>]
//! - featurestore schemas --data <path> [--config <path>]
//!
//! Without `--request` the query is read as one JSON line from stdin.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Query a JSON feature dataset
#[derive(Parser, Debug)]
#[command(name = "featurestore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Where records come from and how the store is configured
#[derive(Args, Debug, Clone)]
pub struct Source {
    /// Dataset file: {"schemas": [..], "records": {"<schema>": [..]}}
    #[arg(long)]
    pub data: PathBuf,

    /// Store configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the records a query selects
    Query {
        #[command(flatten)]
        source: Source,

        /// Query file; stdin when omitted
        #[arg(long)]
        request: Option<PathBuf>,
    },

    /// Print how many records a query selects
    Count {
        #[command(flatten)]
        source: Source,

        /// Query file; stdin when omitted
        #[arg(long)]
        request: Option<PathBuf>,
    },

    /// Print the bounds of the records a query selects
    Extent {
        #[command(flatten)]
        source: Source,

        /// Query file; stdin when omitted
        #[arg(long)]
        request: Option<PathBuf>,
    },

    /// List the schemas of a dataset
    Schemas {
        #[command(flatten)]
        source: Source,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
