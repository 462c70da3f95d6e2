//! Error types for wikicheck

use thiserror::Error;

/// Result type alias using the wikicheck common Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
