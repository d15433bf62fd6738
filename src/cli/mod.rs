//! CLI module for featurestore
//!
//! Provides one-shot commands over a JSON dataset:
//! - query: Print the records a query selects
//! - count: Print how many records a query selects
//! - extent: Print the bounds of the selected records
//! - schemas: List dataset schemas

mod args;
mod commands;
mod errors;
mod io;
mod request;

pub use args::{Cli, Command, Source};
pub use commands::{count, execute, extent, query, run, run_command, schemas};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use request::{parse_filter, Request};
