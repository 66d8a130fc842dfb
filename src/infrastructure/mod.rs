//! Infrastructure layer: configuration loading and logging setup.

pub mod config;
pub mod logging;

pub use config::{ConfigError, ConfigLoader};
pub use logging::{init_logging, LoggerGuard};
