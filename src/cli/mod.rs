//! CLI module for contactsearch
//!
//! Provides command-line interface for:
//! - search: Run a federated search over a fixture directory
//! - explain: Show the dispatch plan and rendered SQL

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, QueryArgs};
pub use commands::{explain, explain_report, run, run_command, run_search, search};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{record_json, Fixture, ProviderFixture};
