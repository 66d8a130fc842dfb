//! Engine configuration structs.
//!
//! Loaded hierarchically by `infrastructure::config::ConfigLoader`;
//! every field has a serde default so partial files and environment
//! overrides merge cleanly.

use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrchestratorConfig {
    /// Wave scheduling defaults.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Confidence gating defaults.
    #[serde(default)]
    pub confidence: ConfidenceConfig,

    /// Rollback snapshot retention.
    #[serde(default)]
    pub snapshots: SnapshotConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Wave scheduling defaults applied when a plan does not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Maximum simultaneously in-flight tasks per wave.
    #[serde(default = "default_max_parallel")]
    pub default_max_parallel: usize,

    /// Base unit of the exponential retry backoff, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

const fn default_max_parallel() -> usize {
    4
}

const fn default_backoff_base_ms() -> u64 {
    100
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_max_parallel: default_max_parallel(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

/// Confidence gating defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConfidenceConfig {
    /// Threshold a score must reach to pass a gate, in [0, 1].
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,

    /// Whether gates may be bypassed with a recorded reason.
    #[serde(default)]
    pub allow_bypass: bool,
}

const fn default_threshold() -> f64 {
    0.8
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
            allow_bypass: false,
        }
    }
}

/// Rollback snapshot retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SnapshotConfig {
    /// Snapshots retained before the oldest is evicted.
    #[serde(default = "default_snapshot_capacity")]
    pub capacity: usize,
}

const fn default_snapshot_capacity() -> usize {
    100
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            capacity: default_snapshot_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Default log level: trace, debug, info, warn, or error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Stdout format: json or pretty.
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rotated JSON log files. Stdout-only when unset.
    #[serde(default)]
    pub log_dir: Option<String>,

    /// File rotation policy: daily, hourly, or never.
    #[serde(default = "default_rotation")]
    pub rotation: String,

    /// Whether to also log to stdout when a log dir is configured.
    #[serde(default = "default_true")]
    pub enable_stdout: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
            enable_stdout: default_true(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.scheduler.default_max_parallel, 4);
        assert_eq!(config.scheduler.backoff_base_ms, 100);
        assert!((config.confidence.default_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.snapshots.capacity, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_yaml_merges_with_defaults() {
        let yaml = "scheduler:\n  default_max_parallel: 8\n";
        let config: OrchestratorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.scheduler.default_max_parallel, 8);
        assert_eq!(config.snapshots.capacity, 100);
    }
}
