//! # Health Aggregator
//!
//! Read-only view combining the error recorder and the circuit-breaker
//! registry into a status payload. Holds no state of its own and never
//! mutates either collaborator; an embedding application polls it from a
//! status endpoint.

use crate::manager::CircuitBreakerRegistry;
use crate::recorder::ErrorRecorder;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Overall system status derived from recent failures and open circuits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health payload surfaced to status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthState,
    /// Errors recorded in the last 5 minutes.
    pub recent_errors: u64,
    /// CRITICAL-severity errors recorded in the last hour.
    pub critical_errors: u64,
    /// Breakers currently in the open state.
    pub open_circuits: u64,
    /// Dashboard heuristic in [0, 100]; not a measured SLA.
    pub uptime_estimate: f64,
    pub last_check: DateTime<Utc>,
}

/// Uptime heuristic reproduced verbatim from the reference system:
/// `max(0, 100 - 2*recent - 10*critical - 5*open)`. It has no derivation
/// beyond being a useful dashboard signal.
pub fn uptime_estimate(recent_errors: u64, critical_errors: u64, open_circuits: u64) -> f64 {
    let estimate =
        100.0 - 2.0 * recent_errors as f64 - 10.0 * critical_errors as f64
            - 5.0 * open_circuits as f64;
    estimate.max(0.0)
}

/// Pure read-side aggregator over the recorder and the registry.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    recorder: Arc<ErrorRecorder>,
    registry: Arc<CircuitBreakerRegistry>,
}

impl HealthMonitor {
    pub fn new(recorder: Arc<ErrorRecorder>, registry: Arc<CircuitBreakerRegistry>) -> Self {
        Self { recorder, registry }
    }

    /// Compute the current health payload.
    ///
    /// Unhealthy when any CRITICAL error landed in the last hour or more
    /// than two circuits are open; degraded when more than ten errors landed
    /// in the last five minutes or any circuit is open; healthy otherwise.
    pub fn health_status(&self) -> HealthReport {
        let recent_errors = self.recorder.recent_error_count(Duration::minutes(5));
        let critical_errors = self.recorder.critical_error_count(Duration::hours(1));
        let open_circuits = self.registry.open_circuit_count() as u64;

        let status = if critical_errors > 0 || open_circuits > 2 {
            HealthState::Unhealthy
        } else if recent_errors > 10 || open_circuits > 0 {
            HealthState::Degraded
        } else {
            HealthState::Healthy
        };

        HealthReport {
            status,
            recent_errors,
            critical_errors,
            open_circuits,
            uptime_estimate: uptime_estimate(recent_errors, critical_errors, open_circuits),
            last_check: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BreakerSettings, CircuitBreakerConfig};
    use crate::error::{ErrorCategory, ErrorSeverity};
    use serde_json::Map;
    use std::collections::HashMap;

    fn monitor() -> (HealthMonitor, Arc<ErrorRecorder>, Arc<CircuitBreakerRegistry>) {
        let recorder = Arc::new(ErrorRecorder::new(1000));
        let registry = Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig {
            default_config: BreakerSettings {
                failure_threshold: 1,
                cooldown_seconds: 300,
                success_threshold: 3,
            },
            component_configs: HashMap::new(),
        }));
        (
            HealthMonitor::new(recorder.clone(), registry.clone()),
            recorder,
            registry,
        )
    }

    #[test]
    fn quiet_system_is_healthy() {
        let (monitor, _, _) = monitor();
        let report = monitor.health_status();
        assert_eq!(report.status, HealthState::Healthy);
        assert_eq!(report.uptime_estimate, 100.0);
        assert_eq!(report.recent_errors, 0);
    }

    #[test]
    fn burst_of_recent_errors_degrades() {
        let (monitor, recorder, _) = monitor();
        for _ in 0..11 {
            recorder.log_error(
                &"flap",
                ErrorCategory::Network,
                ErrorSeverity::Low,
                Map::new(),
            );
        }

        let report = monitor.health_status();
        assert_eq!(report.status, HealthState::Degraded);
        assert_eq!(report.recent_errors, 11);
        assert_eq!(report.uptime_estimate, 78.0);
    }

    #[test]
    fn any_critical_error_is_unhealthy() {
        let (monitor, recorder, _) = monitor();
        recorder.log_error(
            &"disk gone",
            ErrorCategory::System,
            ErrorSeverity::Critical,
            Map::new(),
        );

        let report = monitor.health_status();
        assert_eq!(report.status, HealthState::Unhealthy);
        assert_eq!(report.critical_errors, 1);
    }

    #[tokio::test]
    async fn one_open_circuit_degrades_three_are_unhealthy() {
        let (monitor, _, registry) = monitor();

        registry.breaker("db").record_failure().await;
        assert_eq!(monitor.health_status().status, HealthState::Degraded);

        registry.breaker("market_data").record_failure().await;
        registry.breaker("inference").record_failure().await;
        let report = monitor.health_status();
        assert_eq!(report.status, HealthState::Unhealthy);
        assert_eq!(report.open_circuits, 3);
    }

    #[test]
    fn uptime_heuristic_clamps_at_zero() {
        assert_eq!(uptime_estimate(0, 0, 0), 100.0);
        assert_eq!(uptime_estimate(5, 1, 2), 100.0 - 10.0 - 10.0 - 10.0);
        assert_eq!(uptime_estimate(100, 100, 100), 0.0);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(HealthState::Unhealthy).unwrap(),
            serde_json::json!("unhealthy")
        );
    }
}
