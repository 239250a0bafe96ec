mod config;

pub use config::{AulodConfig, ConfigError};
