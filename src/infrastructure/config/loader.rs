use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid concurrent_event_calls: {0}. Must be at least 1")]
    InvalidConcurrentEventCalls(usize),

    #[error(
        "Invalid drain frequency: min ({0}s) must be positive and no greater than max ({1}s)"
    )]
    InvalidDrainFrequency(u64, u64),

    #[error("Invalid backoff configuration: min ({0}ms) must be positive and less than max ({1}ms)")]
    InvalidBackoff(u64, u64),

    #[error("Invalid backoff multiple: {0}. Must be greater than 1.0")]
    InvalidBackoffMultiple(f64),

    #[error("Invalid backoff jitter multiple: {0}. Must be in [0.0, 1.0)")]
    InvalidJitterMultiple(f64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .herald/config.yaml (project config)
    /// 3. .herald/local.yaml (local overrides, optional)
    /// 4. Environment variables (HERALD_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".herald/config.yaml"))
            .merge(Yaml::file(".herald/local.yaml"))
            .merge(Env::prefixed("HERALD_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let handler = &config.handler;

        if handler.concurrent_event_calls == 0 {
            return Err(ConfigError::InvalidConcurrentEventCalls(
                handler.concurrent_event_calls,
            ));
        }

        if handler.min_drain_events_frequency_secs == 0
            || handler.min_drain_events_frequency_secs > handler.max_drain_events_frequency_secs
        {
            return Err(ConfigError::InvalidDrainFrequency(
                handler.min_drain_events_frequency_secs,
                handler.max_drain_events_frequency_secs,
            ));
        }

        let backoff = &handler.backoff;
        if backoff.submit_state_backoff_min_ms == 0
            || backoff.submit_state_backoff_min_ms >= backoff.submit_state_backoff_max_ms
        {
            return Err(ConfigError::InvalidBackoff(
                backoff.submit_state_backoff_min_ms,
                backoff.submit_state_backoff_max_ms,
            ));
        }
        if backoff.submit_state_backoff_multiple <= 1.0 {
            return Err(ConfigError::InvalidBackoffMultiple(
                backoff.submit_state_backoff_multiple,
            ));
        }
        if !(0.0..1.0).contains(&backoff.submit_state_backoff_jitter_multiple) {
            return Err(ConfigError::InvalidJitterMultiple(
                backoff.submit_state_backoff_jitter_multiple,
            ));
        }

        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(ConfigError::InvalidLogLevel(other.to_string())),
        }
        match config.logging.format.as_str() {
            "json" | "pretty" => {}
            other => return Err(ConfigError::InvalidLogFormat(other.to_string())),
        }

        Ok(())
    }
}
