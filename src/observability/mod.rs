//! Observability for contact search
//!
//! - Structured lifecycle events through `tracing` (`ObservationScope`)
//! - Monotonic counters (`SearchMetrics`)
//!
//! Event names are upper snake case with a lifecycle suffix, e.g.
//! `FEDERATED_SEARCH_BEGIN`, `FEDERATED_SEARCH_COMPLETE`,
//! `FEDERATED_SEARCH_FAILED`. Observability is read-only: nothing here
//! influences search results.

mod metrics;
mod scope;

pub use metrics::{MetricsSnapshot, SearchMetrics};
pub use scope::{ObservationScope, Timer};
