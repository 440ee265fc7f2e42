//! Search metrics
//!
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for federated searches
///
/// All counters use Relaxed ordering; readers only need eventual values.
#[derive(Debug, Default)]
pub struct SearchMetrics {
    /// Searches that returned a result stream
    searches_executed: AtomicU64,
    /// Searches rejected as bad requests
    searches_rejected: AtomicU64,
    /// Searches failed by a provider
    searches_failed: AtomicU64,
    /// Provider dispatches started
    dispatches: AtomicU64,
    /// Provider calls that ran out of time
    provider_timeouts: AtomicU64,
    /// Searches that needed an ordered merge
    merges: AtomicU64,
}

impl SearchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_searches_executed(&self) {
        self.searches_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_searches_rejected(&self) {
        self.searches_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_searches_failed(&self) {
        self.searches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_dispatches(&self, count: u64) {
        self.dispatches.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_provider_timeouts(&self) {
        self.provider_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_merges(&self) {
        self.merges.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            searches_executed: self.searches_executed.load(Ordering::Relaxed),
            searches_rejected: self.searches_rejected.load(Ordering::Relaxed),
            searches_failed: self.searches_failed.load(Ordering::Relaxed),
            dispatches: self.dispatches.load(Ordering::Relaxed),
            provider_timeouts: self.provider_timeouts.load(Ordering::Relaxed),
            merges: self.merges.load(Ordering::Relaxed),
        }
    }

    /// Snapshot as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Plain copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub searches_executed: u64,
    pub searches_rejected: u64,
    pub searches_failed: u64,
    pub dispatches: u64,
    pub provider_timeouts: u64,
    pub merges: u64,
}
