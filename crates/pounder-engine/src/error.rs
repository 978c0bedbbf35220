use std::path::PathBuf;

use pounder_config::ConfigError;
use pounder_gateway::GatewayError;
use thiserror::Error;

/// Startup failures. Nothing raised once the loop is running ends up here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("root directory does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("root is not a directory: {0}")]
    RootNotADirectory(PathBuf),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}
