//! contactsearch CLI entry point
//!
//! Installs the log subscriber, then hands everything to `cli::run`.
//! Logs go to stderr so stdout stays machine-readable.

use contactsearch::cli;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
