//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty stdout formatting
//! - Optional rotated JSON log files via tracing-appender

use std::io;

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::domain::models::LoggingConfig;

const LOG_FILE_PREFIX: &str = "wavefront.log";

/// Handle keeping the file writer alive; drop it on shutdown to flush.
pub struct LoggerGuard {
    _guard: Option<WorkerGuard>,
}

/// Initialize the global subscriber from the logging configuration.
///
/// The `RUST_LOG` environment variable still takes precedence over the
/// configured level. Returns an error if a subscriber is already set or
/// the configuration names an unknown level, format, or rotation.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggerGuard> {
    let default_level = parse_log_level(&config.level)?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let guard = if let Some(log_dir) = &config.log_dir {
        let file_appender = match config.rotation.as_str() {
            "daily" => rolling::daily(log_dir, LOG_FILE_PREFIX),
            "hourly" => rolling::hourly(log_dir, LOG_FILE_PREFIX),
            "never" => rolling::never(log_dir, LOG_FILE_PREFIX),
            other => return Err(anyhow!("unknown rotation policy: {other}")),
        };
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

        // File output is always JSON for downstream tooling.
        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking_file)
            .with_ansi(false)
            .with_target(true)
            .with_filter(env_filter);

        if config.enable_stdout {
            let stdout_filter = EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy();
            match config.format.as_str() {
                "json" => {
                    let stdout_layer = tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(io::stdout)
                        .with_target(true)
                        .with_filter(stdout_filter);
                    tracing_subscriber::registry()
                        .with(file_layer)
                        .with(stdout_layer)
                        .try_init()?;
                }
                "pretty" => {
                    let stdout_layer = tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(io::stdout)
                        .with_target(true)
                        .with_filter(stdout_filter);
                    tracing_subscriber::registry()
                        .with(file_layer)
                        .with(stdout_layer)
                        .try_init()?;
                }
                other => return Err(anyhow!("unknown log format: {other}")),
            }
        } else {
            tracing_subscriber::registry().with(file_layer).try_init()?;
        }
        Some(guard)
    } else {
        match config.format.as_str() {
            "json" => {
                let stdout_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stdout)
                    .with_target(true)
                    .with_filter(env_filter);
                tracing_subscriber::registry().with(stdout_layer).try_init()?;
            }
            "pretty" => {
                let stdout_layer = tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(io::stdout)
                    .with_target(true)
                    .with_filter(env_filter);
                tracing_subscriber::registry().with(stdout_layer).try_init()?;
            }
            other => return Err(anyhow!("unknown log format: {other}")),
        }
        None
    };

    Ok(LoggerGuard { _guard: guard })
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(anyhow!("unknown log level: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
        assert!(parse_log_level("loud").is_err());
    }
}
