// Error types for configuration loading and component wiring

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration key not found: {0}")]
    KeyNotFound(String),

    /// Source could not be read or its format is unknown
    #[error("Failed to load configuration from {source_name}: {reason}")]
    Load { source_name: String, reason: String },

    #[error("Failed to parse {format} configuration: {reason}")]
    Parse { format: &'static str, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Value exists but does not have the requested shape
    #[error("Configuration value `{key}` has the wrong shape: {reason}")]
    Shape { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    /// The container rejected a configured component or alias
    #[error(transparent)]
    Component(#[from] keystone_core::Error),
}

impl ConfigError {
    /// Check if the configuration was rejected rather than missing or unreadable
    pub fn is_invalid(&self) -> bool {
        matches!(self, ConfigError::Invalid(_) | ConfigError::Shape { .. })
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
