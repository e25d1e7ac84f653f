//! # Configuration
//!
//! Serde-backed configuration for the resilience layer. Named components
//! inherit `default_config` unless an entry in `component_configs` overrides
//! them, so a config file only needs to spell out the dependencies that
//! deviate from the defaults.
//!
//! Durations are expressed in seconds in the file format and converted to
//! [`std::time::Duration`] at the internal boundary.

use crate::error::{ResilienceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for a [`crate::core::ResilienceCore`] instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Maximum number of error events retained in the sliding history.
    pub error_history_limit: usize,

    /// Circuit breaker thresholds, global defaults plus per-component overrides.
    pub circuit_breakers: CircuitBreakerConfig,

    /// Fallback executor settings.
    pub fallback: FallbackConfig,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            error_history_limit: 1000,
            circuit_breakers: CircuitBreakerConfig::default(),
            fallback: FallbackConfig::default(),
        }
    }
}

impl ResilienceConfig {
    /// Load configuration from a file, with `RESILIENCE`-prefixed environment
    /// variables taking precedence over file values.
    pub fn from_file(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("RESILIENCE").separator("__"))
            .build()
            .map_err(|e| ResilienceError::Configuration(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| ResilienceError::Configuration(e.to_string()))
    }
}

/// Circuit breaker configuration: defaults for new breakers plus specific
/// settings for named components.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Settings applied to any component without an explicit entry.
    pub default_config: BreakerSettings,

    /// Per-component overrides, keyed by dependency name.
    pub component_configs: HashMap<String, BreakerSettings>,
}

impl CircuitBreakerConfig {
    /// Get the settings for a specific component, falling back to the defaults.
    pub fn config_for_component(&self, component_name: &str) -> BreakerSettings {
        self.component_configs
            .get(component_name)
            .cloned()
            .unwrap_or_else(|| self.default_config.clone())
    }
}

/// Breaker thresholds for a single component.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u64,

    /// Time to wait after the last failure before probing recovery (seconds).
    pub cooldown_seconds: u64,

    /// Consecutive half-open successes required to close the circuit.
    pub success_threshold: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_seconds: 300,
            success_threshold: 3,
        }
    }
}

impl BreakerSettings {
    /// Cooldown window as a `Duration`.
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

/// Fallback executor settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Maximum age at which a cached result is still served (seconds).
    pub cache_ttl_seconds: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 3600,
        }
    }
}

impl FallbackConfig {
    /// Cache time-to-live as a `Duration`.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = ResilienceConfig::default();
        assert_eq!(config.error_history_limit, 1000);
        assert_eq!(config.circuit_breakers.default_config.failure_threshold, 5);
        assert_eq!(config.circuit_breakers.default_config.cooldown_seconds, 300);
        assert_eq!(config.circuit_breakers.default_config.success_threshold, 3);
        assert_eq!(config.fallback.cache_ttl_seconds, 3600);
    }

    #[test]
    fn component_config_falls_back_to_default() {
        let mut component_configs = HashMap::new();
        component_configs.insert(
            "database".to_string(),
            BreakerSettings {
                failure_threshold: 3,
                cooldown_seconds: 45,
                success_threshold: 2,
            },
        );
        let config = CircuitBreakerConfig {
            default_config: BreakerSettings::default(),
            component_configs,
        };

        assert_eq!(config.config_for_component("database").failure_threshold, 3);
        assert_eq!(config.config_for_component("market_data").failure_threshold, 5);
    }

    #[test]
    fn loads_yaml_file_with_partial_overrides() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            concat!(
                "error_history_limit: 250\n",
                "circuit_breakers:\n",
                "  default_config:\n",
                "    failure_threshold: 4\n",
                "  component_configs:\n",
                "    inference:\n",
                "      failure_threshold: 2\n",
                "      cooldown_seconds: 30\n",
                "      success_threshold: 1\n",
                "fallback:\n",
                "  cache_ttl_seconds: 120",
            )
        )
        .unwrap();

        let config = ResilienceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.error_history_limit, 250);
        // Unspecified fields inside an overridden section keep their defaults.
        assert_eq!(config.circuit_breakers.default_config.failure_threshold, 4);
        assert_eq!(config.circuit_breakers.default_config.cooldown_seconds, 300);
        let inference = config.circuit_breakers.config_for_component("inference");
        assert_eq!(inference.failure_threshold, 2);
        assert_eq!(inference.cooldown(), Duration::from_secs(30));
        assert_eq!(config.fallback.cache_ttl(), Duration::from_secs(120));
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let result = ResilienceConfig::from_file(Path::new("does-not-exist.yaml"));
        assert!(matches!(result, Err(ResilienceError::Configuration(_))));
    }
}
