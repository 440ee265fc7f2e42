//! Router configuration

use std::time::Duration;

use serde::Deserialize;

/// Default per-provider timeout
pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 10_000;

/// Default dispatch concurrency
pub const DEFAULT_MAX_CONCURRENT_DISPATCHES: usize = 4;

/// Dispatch limits for the federation router
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouterConfig {
    /// Time budget for one provider call
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Provider calls in flight at once; 1 dispatches sequentially
    #[serde(default = "default_max_concurrent_dispatches")]
    pub max_concurrent_dispatches: usize,
}

fn default_provider_timeout_ms() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_MS
}

fn default_max_concurrent_dispatches() -> usize {
    DEFAULT_MAX_CONCURRENT_DISPATCHES
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: DEFAULT_PROVIDER_TIMEOUT_MS,
            max_concurrent_dispatches: DEFAULT_MAX_CONCURRENT_DISPATCHES,
        }
    }
}

impl RouterConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_concurrent_dispatches(mut self, max: usize) -> Self {
        self.max_concurrent_dispatches = max;
        self
    }
}
