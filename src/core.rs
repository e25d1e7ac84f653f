//! # Composition Root
//!
//! [`ResilienceCore`] wires the error recorder, circuit-breaker registry,
//! execution guard, fallback executor, and health monitor into one
//! explicitly constructed instance. The reference system exposed these as a
//! module-level singleton; here the application's composition root owns one
//! core per process and passes it by reference to every call site.

use crate::config::ResilienceConfig;
use crate::error::{
    ErrorCategory, ErrorSeverity, FallbackError, GuardError, Result,
};
use crate::fallback::FallbackExecutor;
use crate::health::{HealthMonitor, HealthReport};
use crate::manager::{CircuitBreakerRegistry, ExecutionGuard};
use crate::metrics::SystemStats;
use crate::recorder::{ErrorEvent, ErrorRecorder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Process-local resilience layer: one instance owns the shared error
/// history, the named breaker map, and the fallback cache.
#[derive(Debug)]
pub struct ResilienceCore {
    recorder: Arc<ErrorRecorder>,
    registry: Arc<CircuitBreakerRegistry>,
    guard: ExecutionGuard,
    fallback: FallbackExecutor,
    health: HealthMonitor,
}

impl ResilienceCore {
    /// Build a core from configuration.
    pub fn new(config: ResilienceConfig) -> Self {
        let recorder = Arc::new(ErrorRecorder::new(config.error_history_limit));
        let registry = Arc::new(CircuitBreakerRegistry::new(config.circuit_breakers.clone()));
        let guard = ExecutionGuard::new(registry.clone(), recorder.clone());
        let fallback = FallbackExecutor::new(config.fallback.cache_ttl(), recorder.clone());
        let health = HealthMonitor::new(recorder.clone(), registry.clone());

        info!(
            error_history_limit = config.error_history_limit,
            cache_ttl_seconds = config.fallback.cache_ttl_seconds,
            "🛡️ Resilience core initialized"
        );

        Self {
            recorder,
            registry,
            guard,
            fallback,
            health,
        }
    }

    /// Build a core from a configuration file (with environment overrides).
    pub fn from_config_file(path: &Path) -> Result<Self> {
        Ok(Self::new(ResilienceConfig::from_file(path)?))
    }

    /// Record a failure with an explicit category and severity. Never fails.
    pub fn log_error<E: fmt::Display>(
        &self,
        error: &E,
        category: ErrorCategory,
        severity: ErrorSeverity,
        context: serde_json::Map<String, serde_json::Value>,
    ) -> ErrorEvent {
        self.recorder.log_error(error, category, severity, context)
    }

    /// Execute an operation under the named circuit breaker.
    pub async fn guard<F, Fut, T, E>(&self, name: &str, operation: F) -> std::result::Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        self.guard.guard(name, operation).await
    }

    /// Execute a primary operation with cache-then-fallback failover.
    pub async fn with_fallback<T, E, P, PF, F, FF>(
        &self,
        key: &str,
        primary: P,
        fallback: F,
        cache_result: bool,
    ) -> std::result::Result<T, FallbackError<E>>
    where
        T: Serialize + DeserializeOwned,
        E: fmt::Display,
        P: FnOnce() -> PF,
        PF: Future<Output = std::result::Result<T, E>>,
        F: FnOnce() -> FF,
        FF: Future<Output = std::result::Result<T, E>>,
    {
        self.fallback
            .with_fallback(key, primary, fallback, cache_result)
            .await
    }

    /// Aggregate stats: recorder counters plus the per-name breaker snapshot.
    pub async fn error_stats(&self) -> SystemStats {
        SystemStats {
            errors: self.recorder.error_stats(),
            circuit_breakers: self.registry.snapshots().await,
        }
    }

    /// Current health payload.
    pub fn health_status(&self) -> HealthReport {
        self.health.health_status()
    }

    /// Manually reset one breaker to closed with a zeroed failure count.
    pub async fn reset_circuit_breaker(&self, name: &str) {
        self.registry.reset(name).await;
    }

    /// Testing/maintenance reset of the error history and counters.
    pub fn clear_error_history(&self) {
        self.recorder.clear();
    }

    /// Shared error recorder, for collaborators that record directly.
    pub fn recorder(&self) -> &Arc<ErrorRecorder> {
        &self.recorder
    }

    /// Shared breaker registry, for read-side inspection.
    pub fn registry(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.registry
    }
}

impl Default for ResilienceCore {
    fn default() -> Self {
        Self::new(ResilienceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthState;
    use serde_json::Map;

    #[tokio::test]
    async fn facade_wires_all_components() {
        let core = ResilienceCore::default();

        core.log_error(
            &"warmup failure",
            ErrorCategory::DataSource,
            ErrorSeverity::Low,
            Map::new(),
        );

        let ok: std::result::Result<u32, GuardError<String>> =
            core.guard("db", || async { Ok(42) }).await;
        assert_eq!(ok.unwrap(), 42);

        let recovered: std::result::Result<f64, FallbackError<String>> = core
            .with_fallback(
                "prices:AAPL",
                || async { Err("down".to_string()) },
                || async { Ok(150.0) },
                true,
            )
            .await;
        assert_eq!(recovered.unwrap(), 150.0);

        let stats = core.error_stats().await;
        assert_eq!(stats.errors.total_errors, 2);
        assert_eq!(stats.errors.fallback_activations, 1);
        assert!(stats.circuit_breakers.contains_key("db"));

        assert_eq!(core.health_status().status, HealthState::Healthy);

        core.clear_error_history();
        assert_eq!(core.error_stats().await.errors.total_errors, 0);
    }
}
