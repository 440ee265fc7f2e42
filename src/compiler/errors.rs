//! Compilation error types
//!
//! Compilation errors are caller-input problems. They are surfaced
//! synchronously and are never retried.

use thiserror::Error;

use crate::catalog::{CatalogError, FieldId};

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompilationError>;

/// Errors raised while building criteria or compiling predicates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    #[error("Unknown field id: {0}")]
    UnknownField(FieldId),

    #[error("Unknown field name: {0}")]
    UnknownFieldName(String),

    #[error("Field {0} cannot be used in a filter")]
    FieldNotFilterable(FieldId),

    #[error("Invalid value for field {field}: '{value}'")]
    InvalidValue { field: FieldId, value: String },

    #[error("No readable folder in search scope")]
    EmptyScope,

    #[error("Search criteria restrict nothing; request match-all explicitly")]
    Unbounded,

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

impl CompilationError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CompilationError::UnknownField(_) | CompilationError::UnknownFieldName(_) => {
                "CONTACT_UNKNOWN_FIELD"
            }
            CompilationError::FieldNotFilterable(_) => "CONTACT_FIELD_NOT_FILTERABLE",
            CompilationError::InvalidValue { .. } => "CONTACT_INVALID_VALUE",
            CompilationError::EmptyScope => "CONTACT_EMPTY_SCOPE",
            CompilationError::Unbounded => "CONTACT_UNBOUNDED_SEARCH",
            CompilationError::InvalidPattern(_) => "CONTACT_INVALID_PATTERN",
        }
    }

    /// Compilation errors describe invalid requests
    pub fn is_retryable(&self) -> bool {
        false
    }
}

impl From<CatalogError> for CompilationError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownField(id) => CompilationError::UnknownField(id),
            CatalogError::UnknownFieldName(name) => CompilationError::UnknownFieldName(name),
            CatalogError::InvalidValue { field, value, .. } => {
                CompilationError::InvalidValue { field, value }
            }
        }
    }
}
