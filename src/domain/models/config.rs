//! Configuration models.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Event handler configuration
    #[serde(default)]
    pub handler: HandlerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            handler: HandlerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Event handler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HandlerConfig {
    /// Maximum number of concurrent control-plane submissions
    #[serde(default = "default_concurrent_event_calls")]
    pub concurrent_event_calls: usize,

    /// Lower bound of the batched-event drain interval, in seconds
    #[serde(default = "default_min_drain_events_frequency_secs")]
    pub min_drain_events_frequency_secs: u64,

    /// Upper bound of the batched-event drain interval, in seconds
    #[serde(default = "default_max_drain_events_frequency_secs")]
    pub max_drain_events_frequency_secs: u64,

    /// Submission retry backoff
    #[serde(default)]
    pub backoff: BackoffConfig,
}

const fn default_concurrent_event_calls() -> usize {
    10
}

const fn default_min_drain_events_frequency_secs() -> u64 {
    10
}

const fn default_max_drain_events_frequency_secs() -> u64 {
    30
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            concurrent_event_calls: default_concurrent_event_calls(),
            min_drain_events_frequency_secs: default_min_drain_events_frequency_secs(),
            max_drain_events_frequency_secs: default_max_drain_events_frequency_secs(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl HandlerConfig {
    pub fn min_drain_frequency(&self) -> Duration {
        Duration::from_secs(self.min_drain_events_frequency_secs)
    }

    pub fn max_drain_frequency(&self) -> Duration {
        Duration::from_secs(self.max_drain_events_frequency_secs)
    }
}

/// Exponential backoff parameters for state submission retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackoffConfig {
    /// Initial delay, in milliseconds
    #[serde(default = "default_submit_state_backoff_min_ms")]
    pub submit_state_backoff_min_ms: u64,

    /// Delay ceiling, in milliseconds
    #[serde(default = "default_submit_state_backoff_max_ms")]
    pub submit_state_backoff_max_ms: u64,

    /// Growth factor applied after each attempt
    #[serde(default = "default_submit_state_backoff_multiple")]
    pub submit_state_backoff_multiple: f64,

    /// Uniform perturbation applied to each delay, as a fraction
    #[serde(default = "default_submit_state_backoff_jitter_multiple")]
    pub submit_state_backoff_jitter_multiple: f64,
}

const fn default_submit_state_backoff_min_ms() -> u64 {
    1_000
}

const fn default_submit_state_backoff_max_ms() -> u64 {
    30_000
}

fn default_submit_state_backoff_multiple() -> f64 {
    1.3
}

fn default_submit_state_backoff_jitter_multiple() -> f64 {
    0.20
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            submit_state_backoff_min_ms: default_submit_state_backoff_min_ms(),
            submit_state_backoff_max_ms: default_submit_state_backoff_max_ms(),
            submit_state_backoff_multiple: default_submit_state_backoff_multiple(),
            submit_state_backoff_jitter_multiple: default_submit_state_backoff_jitter_multiple(),
        }
    }
}

impl BackoffConfig {
    pub fn min(&self) -> Duration {
        Duration::from_millis(self.submit_state_backoff_min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.submit_state_backoff_max_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_defaults() {
        let config = HandlerConfig::default();
        assert_eq!(config.concurrent_event_calls, 10);
        assert_eq!(config.min_drain_frequency(), Duration::from_secs(10));
        assert_eq!(config.max_drain_frequency(), Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_defaults() {
        let config = BackoffConfig::default();
        assert_eq!(config.min(), Duration::from_secs(1));
        assert_eq!(config.max(), Duration::from_secs(30));
        assert!((config.submit_state_backoff_multiple - 1.3).abs() < f64::EPSILON);
        assert!((config.submit_state_backoff_jitter_multiple - 0.20).abs() < f64::EPSILON);
    }

    #[test]
    fn test_logging_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "json");
    }
}
