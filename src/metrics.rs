//! # Stats Payloads
//!
//! Serializable snapshot types surfaced by the stats and health endpoints of
//! an embedding application. Everything here is a point-in-time copy; none of
//! these types hold live references into the recorder or the registry.

use crate::circuit_breaker::CircuitState;
use crate::error::{ErrorCategory, ErrorSeverity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entry of the top-categories ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: ErrorCategory,
    pub count: u64,
}

/// Aggregate error statistics from the recorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorStats {
    /// Total errors recorded since startup (or the last history clear).
    pub total_errors: u64,

    /// Error counts per category.
    pub by_category: HashMap<ErrorCategory, u64>,

    /// Error counts per severity.
    pub by_severity: HashMap<ErrorSeverity, u64>,

    /// Calls rejected by an open circuit.
    pub circuit_trips: u64,

    /// Primary failures recovered through cache or fallback.
    pub fallback_activations: u64,

    /// Errors recorded in the last hour.
    pub last_hour: u64,

    /// Errors recorded in the last 24 hours.
    pub last_24_hours: u64,

    /// Top 5 categories by volume, descending.
    pub top_categories: Vec<CategoryCount>,
}

/// Point-in-time state of a single named circuit breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u64,
    pub last_failure: Option<DateTime<Utc>>,
}

/// Combined stats payload: recorder aggregates plus the per-name breaker map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub errors: ErrorStats,
    pub circuit_breakers: HashMap<String, BreakerSnapshot>,
}
