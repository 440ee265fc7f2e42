//! ObservationScope for begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` or `{name}_FAILED` when closed explicitly
//! - Logs `{name}_INCOMPLETE` if dropped without either (e.g. a cancelled future)

use std::time::Instant;

use tracing::{error, info, warn};

/// A scope that logs lifecycle events for one operation
///
/// # Usage
///
/// ```ignore
/// let scope = ObservationScope::with_fields("FEDERATED_SEARCH", &[("search_id", id)]);
/// // ... do work ...
/// scope.complete_with_fields(&[("streams", "3")]);
/// ```
pub struct ObservationScope {
    name: &'static str,
    completed: bool,
    fields: Vec<(&'static str, String)>,
    timer: Timer,
}

impl ObservationScope {
    /// Creates a scope and logs `{name}_BEGIN`
    pub fn new(name: &'static str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Creates a scope whose fields are repeated on every event it logs
    pub fn with_fields(name: &'static str, fields: &[(&'static str, &str)]) -> Self {
        let scope = Self {
            name,
            completed: false,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            timer: Timer::new(),
        };
        info!(
            fields = %render(&scope.fields, &[]),
            "{}_BEGIN", name
        );
        scope
    }

    /// Logs `{name}_COMPLETE`
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Logs `{name}_COMPLETE` with additional fields
    pub fn complete_with_fields(mut self, extra: &[(&str, &str)]) {
        self.completed = true;
        info!(
            elapsed_ms = self.timer.elapsed_ms(),
            fields = %render(&self.fields, extra),
            "{}_COMPLETE", self.name
        );
    }

    /// Logs `{name}_FAILED` with a reason
    pub fn fail(mut self, code: &str, reason: &str) {
        self.completed = true;
        error!(
            elapsed_ms = self.timer.elapsed_ms(),
            code,
            reason,
            fields = %render(&self.fields, &[]),
            "{}_FAILED", self.name
        );
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.completed {
            warn!(
                reason = "scope dropped without completion",
                fields = %render(&self.fields, &[]),
                "{}_INCOMPLETE", self.name
            );
        }
    }
}

fn render(fields: &[(&'static str, String)], extra: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| (*k, v.as_str()))
        .chain(extra.iter().copied())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Elapsed time since creation
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed whole milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
