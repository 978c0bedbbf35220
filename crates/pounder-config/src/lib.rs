//! Configuration for the pounder filesystem stress harness.
//!
//! Configs are YAML documents; every field has a default so an empty file
//! (or no file at all) is a valid configuration.

mod defaults;
mod env;
pub mod types;
mod validation;

use std::path::Path;

pub use types::*;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Missing environment variables: {0:?}")]
    MissingEnvVars(Vec<String>),

    #[error("Gate '{0}' is {1}, must be between 0 and 10")]
    InvalidGate(String, u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PounderConfig {
    /// Parse a configuration from a YAML string.
    /// Environment variables in the format `${VAR_NAME}` will be interpolated.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let interpolated = env::interpolate_env(yaml)?;

        // An empty document deserializes to unit, not to a map.
        if interpolated.trim().is_empty() {
            return Ok(PounderConfig::default());
        }

        let config: PounderConfig = serde_yaml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Load a configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
