//! Error types for plugin authors

use thiserror::Error;

/// Errors that plugin lifecycle hooks can return
#[derive(Error, Debug)]
pub enum PluginError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A dependency the plugin needs at runtime is unusable
    #[error("Dependency error: {0}")]
    Dependency(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

impl PluginError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a dependency error
    pub fn dependency(message: impl Into<String>) -> Self {
        Self::Dependency(message.into())
    }
}
