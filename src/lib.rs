#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Resilience Core
//!
//! Process-local resilience layer that protects a backend from cascading
//! failures of unreliable dependencies (databases, external data providers,
//! inference calls) and keeps the system answering in degraded mode instead
//! of failing outright.
//!
//! ## Architecture
//!
//! - **Error taxonomy and recorder**: closed category/severity enumerations
//!   and a bounded sliding-window history with aggregate counters.
//! - **Circuit breakers**: one independent closed/open/half-open state
//!   machine per dependency name, created lazily in a shared registry.
//! - **Execution guard**: wraps caller-supplied operations with breaker
//!   enforcement and records trips and failures.
//! - **Fallback executor**: cache-then-fallback failover with a TTL-judged,
//!   last-write-wins result cache.
//! - **Health aggregator**: read-only status payload derived from the
//!   recorder and the registry.
//!
//! Everything is local to one running instance: no cross-process breaker
//! state, no persistence of error history, and no deadline enforcement on
//! wrapped operations - a caller that needs a timeout imposes it externally
//! and reports the result back in as an ordinary failure.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resilience_core::{ResilienceConfig, ResilienceCore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // One core per process, owned by the composition root.
//! let core = ResilienceCore::new(ResilienceConfig::default());
//!
//! // Guard a dependency call behind its named circuit breaker.
//! let rows = core
//!     .guard("database", || async {
//!         Ok::<_, std::io::Error>(vec!["row".to_string()])
//!     })
//!     .await?;
//!
//! // Failover to cache, then to a fallback operation.
//! let price: f64 = core
//!     .with_fallback(
//!         "prices:AAPL",
//!         || async { Err::<f64, String>("feed down".to_string()) },
//!         || async { Ok(150.0) },
//!         true,
//!     )
//!     .await?;
//!
//! println!("rows={rows:?} price={price} health={:?}", core.health_status().status);
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod core;
pub mod error;
pub mod fallback;
pub mod health;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod recorder;

pub use circuit_breaker::{BreakerConfig, CircuitBreaker, CircuitState};
pub use config::{BreakerSettings, CircuitBreakerConfig, FallbackConfig, ResilienceConfig};
pub use core::ResilienceCore;
pub use error::{
    ErrorCategory, ErrorSeverity, FallbackError, GuardError, ResilienceError, Result,
};
pub use fallback::{FallbackCacheEntry, FallbackExecutor};
pub use health::{HealthMonitor, HealthReport, HealthState};
pub use logging::init_logging;
pub use manager::{CircuitBreakerRegistry, ExecutionGuard};
pub use metrics::{BreakerSnapshot, CategoryCount, ErrorStats, SystemStats};
pub use recorder::{ErrorEvent, ErrorRecorder};
