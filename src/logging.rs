//! # Structured Logging
//!
//! Environment-aware `tracing` initialization for applications embedding the
//! resilience layer. Library code only emits events; installing a subscriber
//! stays the application's decision, so initialization is optional and safe
//! to call more than once.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize a console `tracing` subscriber with an environment-derived filter.
///
/// Honors `RUST_LOG`; defaults to `info` when unset. Idempotent, and a no-op
/// when the embedding application has already installed a global subscriber.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_filter(filter),
        );

        // Use try_init to avoid a panic if a global subscriber is already set.
        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }
    });
}
