use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug)]
pub struct AulodConfig {
    #[serde(default = "defaults::sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "defaults::buffer_frames")]
    pub buffer_frames: u32,
    /// Cycles to run before exiting; 0 means run until killed.
    #[serde(default = "defaults::cycles")]
    pub cycles: u64,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn sample_rate() -> u32 {
        48_000
    }

    pub fn buffer_frames() -> u32 {
        256
    }

    pub fn cycles() -> u64 {
        1_000
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

impl AulodConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: AulodConfig = toml::from_str(&raw)?;
        Ok(config)
    }
}
