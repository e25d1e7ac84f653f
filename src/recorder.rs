//! # Error Recorder
//!
//! Bounded sliding-window history of categorized failures plus aggregate
//! counters. The history is capped at a configured maximum and evicts oldest
//! entries first; counters survive eviction and are only reset by an explicit
//! [`ErrorRecorder::clear`].
//!
//! Recording never fails regardless of input. Every recorded event is also
//! emitted to the `tracing` sink at a severity-derived level, so MEDIUM and
//! above surface as ERROR in the application log stream.

use crate::error::{ErrorCategory, ErrorSeverity};
use crate::metrics::{CategoryCount, ErrorStats};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, warn};
use uuid::Uuid;

/// A single structured record of one failure occurrence.
///
/// Immutable after creation except for the resolution fields, which are set
/// once through [`ErrorRecorder::resolve`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Short name of the failure's underlying Rust type.
    pub kind: String,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub message: String,
    pub context: serde_json::Map<String, serde_json::Value>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct HistoryInner {
    events: VecDeque<ErrorEvent>,
    by_category: HashMap<ErrorCategory, u64>,
    by_severity: HashMap<ErrorSeverity, u64>,
    total: u64,
}

/// Shared recorder of failure events and resilience counters.
///
/// All mutation happens behind a single `RwLock` plus atomics, so concurrent
/// callers on a multi-threaded runtime cannot race on counter increments or
/// history trimming.
#[derive(Debug)]
pub struct ErrorRecorder {
    max_history: usize,
    inner: RwLock<HistoryInner>,
    circuit_trips: AtomicU64,
    fallback_activations: AtomicU64,
}

impl ErrorRecorder {
    /// Create a recorder retaining at most `max_history` events.
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            inner: RwLock::new(HistoryInner::default()),
            circuit_trips: AtomicU64::new(0),
            fallback_activations: AtomicU64::new(0),
        }
    }

    /// Record a failure with an explicit category and severity.
    ///
    /// Builds an [`ErrorEvent`] stamped with the current time, appends it to
    /// the history (evicting the oldest entry past the cap), bumps the
    /// aggregate counters, and emits the event to the logging sink. Returns
    /// the recorded event.
    pub fn log_error<E: fmt::Display>(
        &self,
        error: &E,
        category: ErrorCategory,
        severity: ErrorSeverity,
        context: serde_json::Map<String, serde_json::Value>,
    ) -> ErrorEvent {
        let event = ErrorEvent {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind: short_type_name::<E>().to_string(),
            category,
            severity,
            message: error.to_string(),
            context,
            resolved: false,
            resolved_at: None,
        };
        self.record(event)
    }

    /// Append a pre-built event. Used internally and by tests that need
    /// back-dated timestamps.
    pub(crate) fn record(&self, event: ErrorEvent) -> ErrorEvent {
        {
            let mut inner = self.inner.write();
            inner.total += 1;
            *inner.by_category.entry(event.category).or_insert(0) += 1;
            *inner.by_severity.entry(event.severity).or_insert(0) += 1;
            inner.events.push_back(event.clone());
            while inner.events.len() > self.max_history {
                inner.events.pop_front();
            }
        }

        match event.severity {
            ErrorSeverity::Low => warn!(
                category = %event.category,
                severity = %event.severity,
                kind = %event.kind,
                message = %event.message,
                "🟡 Failure recorded"
            ),
            _ => error!(
                category = %event.category,
                severity = %event.severity,
                kind = %event.kind,
                message = %event.message,
                "🔴 Failure recorded"
            ),
        }

        event
    }

    /// Mark an event as resolved. Returns false if the event has already been
    /// evicted from the history.
    pub fn resolve(&self, id: Uuid) -> bool {
        let mut inner = self.inner.write();
        match inner.events.iter_mut().find(|e| e.id == id) {
            Some(event) => {
                event.resolved = true;
                event.resolved_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    /// Count a call rejected by an open circuit.
    pub fn record_circuit_trip(&self) {
        self.circuit_trips.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a primary failure recovered through cache or fallback.
    pub fn record_fallback_activation(&self) {
        self.fallback_activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn circuit_trips(&self) -> u64 {
        self.circuit_trips.load(Ordering::Relaxed)
    }

    pub fn fallback_activations(&self) -> u64 {
        self.fallback_activations.load(Ordering::Relaxed)
    }

    /// Number of events currently held in the history window.
    pub fn history_len(&self) -> usize {
        self.inner.read().events.len()
    }

    /// Most recent events, newest last, up to `limit`.
    pub fn recent_events(&self, limit: usize) -> Vec<ErrorEvent> {
        let inner = self.inner.read();
        let skip = inner.events.len().saturating_sub(limit);
        inner.events.iter().skip(skip).cloned().collect()
    }

    /// Events recorded within the given window, regardless of severity.
    pub fn recent_error_count(&self, window: Duration) -> u64 {
        let cutoff = Utc::now() - window;
        let inner = self.inner.read();
        inner.events.iter().filter(|e| e.timestamp > cutoff).count() as u64
    }

    /// CRITICAL-severity events recorded within the given window.
    pub fn critical_error_count(&self, window: Duration) -> u64 {
        let cutoff = Utc::now() - window;
        let inner = self.inner.read();
        inner
            .events
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Critical && e.timestamp > cutoff)
            .count() as u64
    }

    /// Aggregate statistics snapshot.
    pub fn error_stats(&self) -> ErrorStats {
        let inner = self.inner.read();
        let now = Utc::now();
        let hour_ago = now - Duration::hours(1);
        let day_ago = now - Duration::hours(24);

        let last_hour = inner.events.iter().filter(|e| e.timestamp > hour_ago).count() as u64;
        let last_24_hours = inner.events.iter().filter(|e| e.timestamp > day_ago).count() as u64;

        let mut top_categories: Vec<CategoryCount> = inner
            .by_category
            .iter()
            .map(|(category, count)| CategoryCount {
                category: *category,
                count: *count,
            })
            .collect();
        // Descending by volume, category name as a deterministic tie-break.
        top_categories.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.category.to_string().cmp(&b.category.to_string()))
        });
        top_categories.truncate(5);

        ErrorStats {
            total_errors: inner.total,
            by_category: inner.by_category.clone(),
            by_severity: inner.by_severity.clone(),
            circuit_trips: self.circuit_trips(),
            fallback_activations: self.fallback_activations(),
            last_hour,
            last_24_hours,
            top_categories,
        }
    }

    /// Testing/maintenance reset of the history and every counter.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.events.clear();
        inner.by_category.clear();
        inner.by_severity.clear();
        inner.total = 0;
        drop(inner);
        self.circuit_trips.store(0, Ordering::Relaxed);
        self.fallback_activations.store(0, Ordering::Relaxed);
    }
}

/// Last path segment of a type name, with any generic arguments stripped.
fn short_type_name<E>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    let base = base.rsplit("::").next().unwrap_or(base);
    base.trim_start_matches('&')
}
