//! # Circuit Breaker Registry and Execution Guard
//!
//! The registry holds one independent [`CircuitBreaker`] per dependency
//! name, created lazily on first use with that component's configured
//! thresholds. Breakers live for the process lifetime; they are reset, never
//! destroyed.
//!
//! The guard is the write path: it is the only place breaker state is
//! mutated, and it reports trips and underlying failures into the shared
//! [`ErrorRecorder`].

use crate::circuit_breaker::{BreakerConfig, CircuitBreaker, CircuitState};
use crate::config::CircuitBreakerConfig;
use crate::error::{ErrorCategory, ErrorSeverity, GuardError};
use crate::metrics::BreakerSnapshot;
use crate::recorder::ErrorRecorder;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Map of named, independently configured circuit breakers.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            config,
        }
    }

    /// Get the breaker for a dependency, creating it on first use with the
    /// component's configured (or default) thresholds.
    pub fn breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                let settings = self.config.config_for_component(name);
                Arc::new(CircuitBreaker::new(
                    name.to_string(),
                    BreakerConfig::from(&settings),
                ))
            })
            .clone()
    }

    /// Names of all breakers created so far.
    pub fn names(&self) -> Vec<String> {
        self.breakers.iter().map(|e| e.key().clone()).collect()
    }

    /// Breakers currently in the open state.
    pub fn open_circuit_count(&self) -> usize {
        self.breakers
            .iter()
            .filter(|e| e.value().state() == CircuitState::Open)
            .count()
    }

    /// Manual reset of one breaker to closed with a zeroed failure count.
    pub async fn reset(&self, name: &str) {
        self.breaker(name).reset().await;
    }

    /// Per-name state snapshot for the stats surface.
    pub async fn snapshots(&self) -> HashMap<String, BreakerSnapshot> {
        // Collect the Arcs first; dashmap guards must not be held across await.
        let breakers: Vec<(String, Arc<CircuitBreaker>)> = self
            .breakers
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let mut snapshots = HashMap::with_capacity(breakers.len());
        for (name, breaker) in breakers {
            snapshots.insert(name, breaker.snapshot().await);
        }
        snapshots
    }
}

/// Wraps caller-supplied operations with breaker enforcement.
#[derive(Debug, Clone)]
pub struct ExecutionGuard {
    registry: Arc<CircuitBreakerRegistry>,
    recorder: Arc<ErrorRecorder>,
}

impl ExecutionGuard {
    pub fn new(registry: Arc<CircuitBreakerRegistry>, recorder: Arc<ErrorRecorder>) -> Self {
        Self { registry, recorder }
    }

    /// Execute an operation under the named breaker.
    ///
    /// Rejects without invoking the operation when the circuit is open and
    /// the cooldown has not elapsed; the rejection is counted as a circuit
    /// trip and recorded. Otherwise the operation runs, its outcome is
    /// recorded against the breaker and the recorder, and its own error is
    /// re-raised unchanged inside [`GuardError::OperationFailed`].
    pub async fn guard<F, Fut, T, E>(&self, name: &str, operation: F) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let breaker = self.registry.breaker(name);

        if !breaker.check_call_allowed().await {
            self.recorder.record_circuit_trip();
            let rejection: GuardError<E> = GuardError::CircuitOpen {
                dependency: name.to_string(),
            };
            let mut context = serde_json::Map::new();
            context.insert("dependency".to_string(), serde_json::json!(name));
            self.recorder.log_error(
                &rejection,
                ErrorCategory::System,
                ErrorSeverity::High,
                context,
            );
            return Err(rejection);
        }

        match operation().await {
            Ok(value) => {
                breaker.record_success().await;
                Ok(value)
            }
            Err(err) => {
                breaker.record_failure().await;
                let mut context = serde_json::Map::new();
                context.insert("dependency".to_string(), serde_json::json!(name));
                context.insert(
                    "breaker_state".to_string(),
                    serde_json::json!(breaker.state()),
                );
                self.recorder.log_error(
                    &err,
                    ErrorCategory::System,
                    ErrorSeverity::Medium,
                    context,
                );
                Err(GuardError::OperationFailed(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BreakerSettings;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    fn registry_with(threshold: u64, cooldown_seconds: u64) -> Arc<CircuitBreakerRegistry> {
        Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig {
            default_config: BreakerSettings {
                failure_threshold: threshold,
                cooldown_seconds,
                success_threshold: 3,
            },
            component_configs: HashMap::new(),
        }))
    }

    #[tokio::test]
    async fn guard_passes_through_success() {
        let recorder = Arc::new(ErrorRecorder::new(100));
        let guard = ExecutionGuard::new(registry_with(5, 300), recorder.clone());

        let result: Result<&str, GuardError<String>> =
            guard.guard("db", || async { Ok("rows") }).await;
        assert_eq!(result.unwrap(), "rows");
        assert_eq!(recorder.history_len(), 0);
    }

    #[tokio::test]
    async fn guard_records_underlying_failures() {
        let recorder = Arc::new(ErrorRecorder::new(100));
        let guard = ExecutionGuard::new(registry_with(5, 300), recorder.clone());

        let result: Result<(), GuardError<String>> = guard
            .guard("db", || async { Err("connection refused".to_string()) })
            .await;

        assert!(matches!(result, Err(GuardError::OperationFailed(_))));
        let events = recorder.recent_events(1);
        assert_eq!(events[0].category, ErrorCategory::System);
        assert_eq!(events[0].severity, ErrorSeverity::Medium);
        assert_eq!(events[0].message, "connection refused");
    }

    #[tokio::test]
    async fn open_circuit_rejects_without_invoking_the_operation() {
        let recorder = Arc::new(ErrorRecorder::new(100));
        let guard = ExecutionGuard::new(registry_with(2, 300), recorder.clone());
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let _: Result<(), GuardError<String>> = guard
                .guard("db", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("boom".to_string())
                })
                .await;
        }

        let result: Result<(), GuardError<String>> = guard
            .guard("db", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(GuardError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(recorder.circuit_trips(), 1);
        // The rejection itself lands in the history at HIGH severity.
        let latest = recorder.recent_events(1);
        assert_eq!(latest[0].severity, ErrorSeverity::High);
    }

    #[tokio::test]
    async fn cooldown_elapse_lets_a_probe_through() {
        let recorder = Arc::new(ErrorRecorder::new(100));
        let registry = registry_with(1, 0);
        let guard = ExecutionGuard::new(registry.clone(), recorder);
        let calls = AtomicU32::new(0);

        let _: Result<(), GuardError<String>> = guard
            .guard("feed", || async { Err("down".to_string()) })
            .await;
        assert_eq!(registry.breaker("feed").state(), CircuitState::Open);

        // Zero cooldown elapses immediately; the next attempt probes.
        sleep(Duration::from_millis(5)).await;
        let result: Result<(), GuardError<String>> = guard
            .guard("feed", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.breaker("feed").state(), CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn breakers_are_independent_per_name() {
        let recorder = Arc::new(ErrorRecorder::new(100));
        let registry = registry_with(1, 300);
        let guard = ExecutionGuard::new(registry.clone(), recorder);

        let _: Result<(), GuardError<String>> = guard
            .guard("db", || async { Err("down".to_string()) })
            .await;

        assert_eq!(registry.breaker("db").state(), CircuitState::Open);
        assert_eq!(registry.breaker("market_data").state(), CircuitState::Closed);
        assert_eq!(registry.open_circuit_count(), 1);
    }

    #[tokio::test]
    async fn component_overrides_apply_to_named_breakers() {
        let mut component_configs = HashMap::new();
        component_configs.insert(
            "flaky".to_string(),
            BreakerSettings {
                failure_threshold: 1,
                cooldown_seconds: 300,
                success_threshold: 1,
            },
        );
        let registry = Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig {
            default_config: BreakerSettings::default(),
            component_configs,
        }));
        let recorder = Arc::new(ErrorRecorder::new(100));
        let guard = ExecutionGuard::new(registry.clone(), recorder);

        let _: Result<(), GuardError<String>> = guard
            .guard("flaky", || async { Err("boom".to_string()) })
            .await;
        let _: Result<(), GuardError<String>> = guard
            .guard("solid", || async { Err("boom".to_string()) })
            .await;

        // One failure opens the overridden breaker but not the default one.
        assert_eq!(registry.breaker("flaky").state(), CircuitState::Open);
        assert_eq!(registry.breaker("solid").state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn reset_reopens_the_path() {
        let recorder = Arc::new(ErrorRecorder::new(100));
        let registry = registry_with(1, 300);
        let guard = ExecutionGuard::new(registry.clone(), recorder);

        let _: Result<(), GuardError<String>> = guard
            .guard("db", || async { Err("down".to_string()) })
            .await;
        assert_eq!(registry.breaker("db").state(), CircuitState::Open);

        registry.reset("db").await;

        let result: Result<&str, GuardError<String>> =
            guard.guard("db", || async { Ok("rows") }).await;
        assert_eq!(result.unwrap(), "rows");
    }
}
