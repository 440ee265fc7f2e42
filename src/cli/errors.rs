//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit status.

use std::fmt;
use std::io;

use crate::catalog::CatalogError;
use crate::compiler::CompilationError;
use crate::config::ConfigError;
use crate::federation::FederationError;
use crate::stream::StreamError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// Fixture directory is missing or malformed
    FixtureError,
    /// Query arguments do not form valid criteria
    InvalidQuery,
    /// The federated search failed
    SearchFailed,
    /// I/O error (stdout)
    IoError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "CONTACT_CLI_CONFIG_ERROR",
            Self::FixtureError => "CONTACT_CLI_FIXTURE_ERROR",
            Self::InvalidQuery => "CONTACT_CLI_INVALID_QUERY",
            Self::SearchFailed => "CONTACT_CLI_SEARCH_FAILED",
            Self::IoError => "CONTACT_CLI_IO_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn fixture_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::FixtureError, msg)
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidQuery, msg)
    }

    pub fn search_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::SearchFailed, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::new(CliErrorCode::ConfigError, format!("{} ({})", e, e.code()))
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        Self::invalid_query(format!("{} ({})", e, e.code()))
    }
}

impl From<CompilationError> for CliError {
    fn from(e: CompilationError) -> Self {
        Self::invalid_query(format!("{} ({})", e, e.code()))
    }
}

impl From<FederationError> for CliError {
    fn from(e: FederationError) -> Self {
        if e.is_bad_request() {
            Self::invalid_query(format!("{} ({})", e, e.code()))
        } else {
            Self::search_failed(format!("{} ({})", e, e.code()))
        }
    }
}

impl From<StreamError> for CliError {
    fn from(e: StreamError) -> Self {
        Self::search_failed(format!("{} ({})", e, e.code()))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
