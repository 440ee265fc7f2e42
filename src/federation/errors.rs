//! Provider and federation error types
//!
//! Compilation problems are bad requests and never retried. Provider
//! failures carry the provider identity and the provider's own opinion on
//! whether a retry may help.

use thiserror::Error;

use crate::compiler::CompilationError;

use super::provider::ProviderId;

/// Result type for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type for federated searches
pub type FederationResult<T> = Result<T, FederationError>;

/// What went wrong inside a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The provider refused the request as invalid
    Rejected(CompilationError),
    /// The backing store failed
    Execution,
    /// The call did not finish within the configured timeout
    Timeout,
    /// The call was cancelled before it finished
    Cancelled,
    /// Bug or broken invariant inside the provider
    Internal,
}

/// A backend failed to execute a search
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Provider {provider} failed: {message}")]
pub struct ProviderError {
    provider: ProviderId,
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    /// The request was invalid for this provider
    pub fn rejected(provider: ProviderId, err: CompilationError) -> Self {
        Self {
            provider,
            message: err.to_string(),
            kind: ProviderErrorKind::Rejected(err),
            retryable: false,
        }
    }

    /// The backing store failed
    pub fn execution(provider: ProviderId, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            provider,
            kind: ProviderErrorKind::Execution,
            message: message.into(),
            retryable,
        }
    }

    /// The call exceeded its time budget
    pub fn timeout(provider: ProviderId, timeout_ms: u64, retryable: bool) -> Self {
        Self {
            provider,
            kind: ProviderErrorKind::Timeout,
            message: format!("no result within {} ms", timeout_ms),
            retryable,
        }
    }

    /// The call was cancelled
    pub fn cancelled(provider: ProviderId, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind: ProviderErrorKind::Cancelled,
            message: message.into(),
            retryable: true,
        }
    }

    /// Broken invariant
    pub fn internal(provider: ProviderId, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind: ProviderErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    pub fn kind(&self) -> &ProviderErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether retrying the whole federated query may succeed
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::Rejected(_) => "CONTACT_PROVIDER_REJECTED",
            ProviderErrorKind::Execution => "CONTACT_PROVIDER_FAILED",
            ProviderErrorKind::Timeout => "CONTACT_PROVIDER_TIMEOUT",
            ProviderErrorKind::Cancelled => "CONTACT_PROVIDER_CANCELLED",
            ProviderErrorKind::Internal => "CONTACT_PROVIDER_INTERNAL",
        }
    }
}

/// Errors surfaced by `FederationRouter::search`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FederationError {
    #[error("Invalid search: {0}")]
    Compilation(#[from] CompilationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Provider registry error: {0}")]
    Registry(String),
}

impl FederationError {
    /// Provider rejections are reported as the compilation error inside
    pub(crate) fn from_provider(err: ProviderError) -> Self {
        match err.kind {
            ProviderErrorKind::Rejected(inner) => FederationError::Compilation(inner),
            _ => FederationError::Provider(err),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            FederationError::Compilation(err) => err.code(),
            FederationError::Provider(err) => err.code(),
            FederationError::Registry(_) => "CONTACT_REGISTRY_INVALID",
        }
    }

    /// Maps to a "bad request" response upstream; everything else is
    /// "service unavailable"
    pub fn is_bad_request(&self) -> bool {
        matches!(self, FederationError::Compilation(_))
    }

    /// Whether retrying the whole query may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FederationError::Provider(err) => err.is_retryable(),
            FederationError::Compilation(_) | FederationError::Registry(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_becomes_compilation_error() {
        let err = ProviderError::rejected(ProviderId::new("db"), CompilationError::EmptyScope);
        assert!(!err.is_retryable());
        let federated = FederationError::from_provider(err);
        assert_eq!(federated, FederationError::Compilation(CompilationError::EmptyScope));
        assert!(federated.is_bad_request());
        assert_eq!(federated.code(), "CONTACT_EMPTY_SCOPE");
    }

    #[test]
    fn test_provider_failure_is_unavailable() {
        let err = ProviderError::execution(ProviderId::new("ldap"), "bind failed", true);
        let federated = FederationError::from_provider(err);
        assert!(!federated.is_bad_request());
        assert!(federated.is_retryable());
        assert_eq!(federated.code(), "CONTACT_PROVIDER_FAILED");
        assert!(federated.to_string().contains("ldap"));
    }

    #[test]
    fn test_timeout_retryability_is_provider_choice() {
        let err = ProviderError::timeout(ProviderId::new("gal"), 250, false);
        assert_eq!(err.kind(), &ProviderErrorKind::Timeout);
        assert!(!err.is_retryable());
        assert!(err.message().contains("250"));
    }
}
