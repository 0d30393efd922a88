//! Prefetch coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Prefetch coordinator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefetchConfig {
    /// Quiet period before a scheduled search runs
    #[serde(rename = "debounce-ms", default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Upper bound on concurrent sales-count lookups during enrichment
    #[serde(rename = "max-concurrent-lookups", default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: usize,

    /// Currency requested from the search executor
    #[serde(rename = "default-currency", default = "default_currency")]
    pub default_currency: String,

    /// Nationality used when the form leaves it blank
    #[serde(rename = "default-nationality", default = "default_nationality")]
    pub default_nationality: String,

    /// Provider-specific prefixes removed from destination ids before searching
    #[serde(rename = "strip-id-prefixes", default = "default_strip_id_prefixes")]
    pub strip_id_prefixes: Vec<String>,
}

fn default_debounce_ms() -> u64 {
    debug!("default_debounce_ms: called");
    200
}

fn default_max_concurrent_lookups() -> usize {
    16
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_nationality() -> String {
    "RS".to_string()
}

fn default_strip_id_prefixes() -> Vec<String> {
    vec!["solvex-c-".to_string()]
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        debug!("PrefetchConfig::default: called");
        Self {
            debounce_ms: default_debounce_ms(),
            max_concurrent_lookups: default_max_concurrent_lookups(),
            default_currency: default_currency(),
            default_nationality: default_nationality(),
            strip_id_prefixes: default_strip_id_prefixes(),
        }
    }
}

impl PrefetchConfig {
    /// Get the default debounce window as a Duration
    pub fn debounce(&self) -> Duration {
        debug!(debounce_ms = %self.debounce_ms, "PrefetchConfig::debounce: called");
        Duration::from_millis(self.debounce_ms)
    }

    /// Lookup concurrency, never below one
    pub fn lookup_concurrency(&self) -> usize {
        self.max_concurrent_lookups.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PrefetchConfig::default();
        assert_eq!(config.debounce_ms, 200);
        assert_eq!(config.max_concurrent_lookups, 16);
        assert_eq!(config.default_currency, "EUR");
        assert_eq!(config.default_nationality, "RS");
        assert_eq!(config.strip_id_prefixes, vec!["solvex-c-".to_string()]);
    }

    #[test]
    fn test_debounce_duration() {
        let config = PrefetchConfig {
            debounce_ms: 350,
            ..Default::default()
        };
        assert_eq!(config.debounce(), Duration::from_millis(350));
    }

    #[test]
    fn test_lookup_concurrency_floor() {
        let config = PrefetchConfig {
            max_concurrent_lookups: 0,
            ..Default::default()
        };
        assert_eq!(config.lookup_concurrency(), 1);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: PrefetchConfig = serde_yaml::from_str("debounce-ms: 50\n").unwrap();
        assert_eq!(config.debounce_ms, 50);
        assert_eq!(config.default_currency, "EUR");
    }
}
