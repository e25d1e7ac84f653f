//! # Error Taxonomy and Failure Types
//!
//! Closed enumerations for failure categories and severities, plus the
//! crate's own failure types. Category and severity are always supplied
//! explicitly at the call site that records an error; nothing in this crate
//! infers them from a failure's type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure categories for recorded errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Database,
    Network,
    Validation,
    Authentication,
    RateLimit,
    DataSource,
    Processing,
    System,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Database => "DATABASE",
            ErrorCategory::Network => "NETWORK",
            ErrorCategory::Validation => "VALIDATION",
            ErrorCategory::Authentication => "AUTHENTICATION",
            ErrorCategory::RateLimit => "RATE_LIMIT",
            ErrorCategory::DataSource => "DATA_SOURCE",
            ErrorCategory::Processing => "PROCESSING",
            ErrorCategory::System => "SYSTEM",
        };
        write!(f, "{name}")
    }
}

/// Failure severities, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorSeverity::Low => "LOW",
            ErrorSeverity::Medium => "MEDIUM",
            ErrorSeverity::High => "HIGH",
            ErrorSeverity::Critical => "CRITICAL",
        };
        write!(f, "{name}")
    }
}

/// Errors produced by the execution guard.
#[derive(Debug, thiserror::Error)]
pub enum GuardError<E> {
    /// Circuit is open, rejecting all calls without invoking the operation.
    #[error("Circuit breaker is open for {dependency}")]
    CircuitOpen { dependency: String },

    /// The wrapped operation failed and was recorded.
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

/// Errors produced by the fallback executor.
///
/// Raised only when fallback is exhausted; a primary failure that is
/// recovered via cache or fallback never surfaces to the caller.
#[derive(Debug, thiserror::Error)]
pub enum FallbackError<E> {
    /// Both the primary and the fallback operation failed for the same key.
    #[error("Primary and fallback both failed for {key} (primary: {primary}; fallback: {fallback})")]
    Exhausted { key: String, primary: E, fallback: E },
}

/// Top-level errors for crate setup and configuration.
#[derive(Debug, thiserror::Error)]
pub enum ResilienceError {
    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, ResilienceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_display_matches_wire_names() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::DataSource.to_string(), "DATA_SOURCE");
        assert_eq!(
            serde_json::to_value(ErrorCategory::RateLimit).unwrap(),
            serde_json::json!("RATE_LIMIT")
        );
    }

    #[test]
    fn severities_are_ordered() {
        assert!(ErrorSeverity::Low < ErrorSeverity::Medium);
        assert!(ErrorSeverity::Medium < ErrorSeverity::High);
        assert!(ErrorSeverity::High < ErrorSeverity::Critical);
    }

    #[test]
    fn guard_error_display() {
        let err: GuardError<String> = GuardError::CircuitOpen {
            dependency: "db".to_string(),
        };
        assert_eq!(err.to_string(), "Circuit breaker is open for db");

        let err: GuardError<String> = GuardError::OperationFailed("timeout".to_string());
        assert_eq!(err.to_string(), "Operation failed: timeout");
    }

    #[test]
    fn fallback_error_names_both_failures() {
        let err: FallbackError<String> = FallbackError::Exhausted {
            key: "prices:AAPL".to_string(),
            primary: "no connection".to_string(),
            fallback: "stale feed".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("prices:AAPL"));
        assert!(message.contains("no connection"));
        assert!(message.contains("stale feed"));
    }
}
