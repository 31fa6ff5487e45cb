//! Configuration and logging setup

pub mod config;
pub mod logging;

pub use config::{ConfigError, ConfigResult, LayoutConfig, MeasurementSettings, RegistrySettings};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
