use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::OrchestratorConfig;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid default_max_parallel: {0}. Must be at least 1")]
    InvalidMaxParallel(usize),

    #[error("Invalid backoff_base_ms: {0}. Must be positive")]
    InvalidBackoffBase(u64),

    #[error("Invalid default_threshold: {0}. Must be within [0, 1]")]
    InvalidThreshold(f64),

    #[error("Invalid snapshot capacity: {0}. Must be at least 1")]
    InvalidSnapshotCapacity(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid rotation policy: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. wavefront.yaml (project config)
    /// 3. wavefront.local.yaml (local overrides, optional)
    /// 4. Environment variables (WAVEFRONT_* prefix, highest priority)
    pub fn load() -> Result<OrchestratorConfig> {
        let config: OrchestratorConfig = Figment::new()
            .merge(Serialized::defaults(OrchestratorConfig::default()))
            .merge(Yaml::file("wavefront.yaml"))
            .merge(Yaml::file("wavefront.local.yaml"))
            .merge(Env::prefixed("WAVEFRONT_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<OrchestratorConfig> {
        let config: OrchestratorConfig = Figment::new()
            .merge(Serialized::defaults(OrchestratorConfig::default()))
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
    pub fn validate(config: &OrchestratorConfig) -> Result<(), ConfigError> {
        if config.scheduler.default_max_parallel == 0 {
            return Err(ConfigError::InvalidMaxParallel(
                config.scheduler.default_max_parallel,
            ));
        }

        if config.scheduler.backoff_base_ms == 0 {
            return Err(ConfigError::InvalidBackoffBase(
                config.scheduler.backoff_base_ms,
            ));
        }

        if !(0.0..=1.0).contains(&config.confidence.default_threshold) {
            return Err(ConfigError::InvalidThreshold(
                config.confidence.default_threshold,
            ));
        }

        if config.snapshots.capacity == 0 {
            return Err(ConfigError::InvalidSnapshotCapacity(
                config.snapshots.capacity,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}
