//! CLI argument parsing using clap
//!
//! Commands:
//! - `contactsearch search --fixture <dir> --user <id> [query options]`
//! - `contactsearch explain --fixture <dir> --user <id> [query options]`

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Federated contact search
#[derive(Parser, Debug)]
#[command(name = "contactsearch")]
#[command(version, about = "Federated, permission-scoped contact search")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a federated search and print matching contacts as JSON lines
    Search {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Print the dispatch plan and the rendered SQL of each dispatch
    Explain {
        #[command(flatten)]
        query: QueryArgs,
    },
}

/// Options shared by `search` and `explain`
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Fixture directory (permissions.json, providers.json, contacts/)
    #[arg(long)]
    pub fixture: PathBuf,

    /// Optional JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Requesting user id
    #[arg(long)]
    pub user: u32,

    /// Context id
    #[arg(long, default_value_t = 1)]
    pub context: u32,

    /// Pattern matched against the display name
    #[arg(long, conflicts_with = "first_letter")]
    pub pattern: Option<String>,

    /// Folder to search; repeatable. Omit for all visible folders.
    #[arg(long = "folder")]
    pub folders: Vec<u32>,

    /// Per-field filter as NAME=VALUE; repeatable
    #[arg(long = "filter", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    /// First-letter bucket: a prefix, `#` for non-letters, a digit for digits
    #[arg(long)]
    pub first_letter: Option<String>,

    /// Record id to exclude
    #[arg(long)]
    pub ignore: Option<u32>,

    /// Combine filters with OR instead of AND
    #[arg(long = "or")]
    pub or_mode: bool,

    /// Auto-complete mode
    #[arg(long)]
    pub auto_complete: bool,

    /// Search every visible contact
    #[arg(long)]
    pub all: bool,

    /// Sort field name
    #[arg(long, default_value = "sur_name")]
    pub sort: String,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// Locale for collated sorting, e.g. `de` or `sv-SE`
    #[arg(long)]
    pub locale: Option<String>,

    /// Maximum number of results
    #[arg(long)]
    pub limit: Option<usize>,
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
