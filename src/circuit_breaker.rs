//! # Circuit Breaker
//!
//! Per-dependency fault isolation following the classic three-state pattern:
//! Closed (normal operation), Open (failing fast), and Half-Open (testing
//! recovery).
//!
//! Transitions:
//! - Closed → Open once the consecutive-failure count reaches the threshold.
//! - Open → Half-Open evaluated lazily on the next call attempt, when the
//!   time since the last recorded failure exceeds the cooldown window. No
//!   background timer is involved.
//! - Half-Open → Closed after the configured number of consecutive
//!   successes; Half-Open → Open on any single failure.

use crate::config::BreakerSettings;
use crate::metrics::BreakerSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Circuit breaker states representing the current operational mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through.
    Closed = 0,
    /// Failure mode - calls are rejected without executing.
    Open = 1,
    /// Testing recovery - calls are allowed through to probe the dependency.
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            2 => CircuitState::HalfOpen,
            // Default to the safest state.
            _ => CircuitState::Open,
        }
    }
}

/// Runtime thresholds for a single breaker.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u64,

    /// Time since the last failure before an open circuit allows a probe.
    pub cooldown: Duration,

    /// Consecutive half-open successes required to close the circuit.
    pub success_threshold: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(300),
            success_threshold: 3,
        }
    }
}

impl From<&BreakerSettings> for BreakerConfig {
    fn from(settings: &BreakerSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold,
            cooldown: settings.cooldown(),
            success_threshold: settings.success_threshold,
        }
    }
}

/// Mutable breaker bookkeeping, serialized by the breaker's own mutex.
#[derive(Debug, Default)]
struct BreakerWindow {
    failure_count: u64,
    half_open_successes: u64,
    last_failure: Option<DateTime<Utc>>,
    last_request: Option<DateTime<Utc>>,
}

/// One independent state machine per dependency name.
///
/// State lives in an atomic for cheap reads; every transition and counter
/// update happens under the window mutex, which keeps transitions for a
/// single name strictly sequential even on a preemptive multi-threaded
/// runtime.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    state: AtomicU8,
    config: BreakerConfig,
    window: Mutex<BreakerWindow>,
}

impl CircuitBreaker {
    /// Create a new breaker in the closed state.
    pub fn new(name: String, config: BreakerConfig) -> Self {
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            cooldown_seconds = config.cooldown.as_secs(),
            success_threshold = config.success_threshold,
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            config,
            window: Mutex::new(BreakerWindow::default()),
        }
    }

    /// Current circuit state.
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Dependency name this breaker guards.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decide whether a call attempt may proceed.
    ///
    /// Updates the last-request timestamp on every attempt, including
    /// rejections. An open circuit whose cooldown has elapsed since the last
    /// recorded failure transitions to half-open here and lets the call
    /// through as a probe.
    pub async fn check_call_allowed(&self) -> bool {
        let mut window = self.window.lock().await;
        window.last_request = Some(Utc::now());

        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => match window.last_failure {
                Some(last_failure) => {
                    let elapsed = Utc::now()
                        .signed_duration_since(last_failure)
                        .to_std()
                        .unwrap_or(Duration::ZERO);
                    if elapsed > self.config.cooldown {
                        self.transition_to_half_open(&mut window);
                        true
                    } else {
                        false
                    }
                }
                None => {
                    // Open with no failure on record; allow the probe.
                    warn!(component = %self.name, "Circuit open but no failure timestamp recorded");
                    self.transition_to_half_open(&mut window);
                    true
                }
            },
        }
    }

    /// Record a successful call.
    pub async fn record_success(&self) {
        let mut window = self.window.lock().await;

        match self.state() {
            CircuitState::Closed => {
                // Threshold counts consecutive failures only.
                window.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                window.half_open_successes += 1;
                if window.half_open_successes >= self.config.success_threshold {
                    self.transition_to_closed(&mut window);
                }
            }
            CircuitState::Open => {
                warn!(component = %self.name, "Success recorded while circuit is open");
            }
        }
    }

    /// Record a failed call.
    pub async fn record_failure(&self) {
        let mut window = self.window.lock().await;
        window.failure_count += 1;
        window.last_failure = Some(Utc::now());

        match self.state() {
            CircuitState::Closed => {
                if window.failure_count >= self.config.failure_threshold {
                    self.transition_to_open(&window);
                }
            }
            CircuitState::HalfOpen => {
                // Any failure while probing reopens immediately.
                window.half_open_successes = 0;
                self.transition_to_open(&window);
            }
            CircuitState::Open => {}
        }
    }

    /// Manual reset to closed with zeroed counters, regardless of prior state.
    pub async fn reset(&self) {
        let mut window = self.window.lock().await;
        self.state
            .store(CircuitState::Closed as u8, Ordering::Release);
        window.failure_count = 0;
        window.half_open_successes = 0;

        info!(component = %self.name, "🟢 Circuit breaker manually reset");
    }

    /// Point-in-time snapshot for the stats surface.
    pub async fn snapshot(&self) -> BreakerSnapshot {
        let window = self.window.lock().await;
        BreakerSnapshot {
            state: self.state(),
            failure_count: window.failure_count,
            last_failure: window.last_failure,
        }
    }

    fn transition_to_closed(&self, window: &mut BreakerWindow) {
        self.state
            .store(CircuitState::Closed as u8, Ordering::Release);
        window.failure_count = 0;
        window.half_open_successes = 0;

        info!(component = %self.name, "🟢 Circuit breaker closed (recovered)");
    }

    fn transition_to_open(&self, window: &BreakerWindow) {
        self.state.store(CircuitState::Open as u8, Ordering::Release);

        error!(
            component = %self.name,
            failure_count = window.failure_count,
            failure_threshold = self.config.failure_threshold,
            cooldown_seconds = self.config.cooldown.as_secs(),
            "🔴 Circuit breaker opened (failing fast)"
        );
    }

    fn transition_to_half_open(&self, window: &mut BreakerWindow) {
        self.state
            .store(CircuitState::HalfOpen as u8, Ordering::Release);
        window.half_open_successes = 0;

        info!(
            component = %self.name,
            success_threshold = self.config.success_threshold,
            "🟡 Circuit breaker half-open (testing recovery)"
        );
    }
}
