//! Stream error types

use thiserror::Error;

use crate::federation::ProviderId;

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Failure while pulling from an open result stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Stream failed{}: {message}", source_suffix(.provider))]
pub struct StreamError {
    provider: Option<ProviderId>,
    message: String,
    retryable: bool,
}

impl StreamError {
    /// Creates a retryable stream error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            provider: None,
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable stream error
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            retryable: false,
            ..Self::new(message)
        }
    }

    /// Attaches the originating provider, unless one is already set
    pub fn from_provider(mut self, provider: &ProviderId) -> Self {
        if self.provider.is_none() {
            self.provider = Some(provider.clone());
        }
        self
    }

    pub fn provider(&self) -> Option<&ProviderId> {
        self.provider.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether retrying the whole query may succeed
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        "CONTACT_STREAM_FAILED"
    }
}

fn source_suffix(provider: &Option<ProviderId>) -> String {
    provider
        .as_ref()
        .map(|p| format!(" (provider {})", p))
        .unwrap_or_default()
}
