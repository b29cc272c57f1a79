//! Global error types for Chatline.
//!
//! Transport failures never surface here: the session absorbs them and turns
//! them into status events. `ChatError` covers setup paths (configuration,
//! logging, CLI) and the few places a caller asks for a hard answer.

use thiserror::Error;

/// Convenience type alias for Results using ChatError.
pub type ChatResult<T> = Result<T, ChatError>;

/// Unified error type for Chatline.
#[derive(Error, Debug)]
pub enum ChatError {
    // -- Configuration errors --
    /// Failed to load, parse or validate application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// The server URL could not be used to open a transport.
    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    // -- Transport errors --
    /// The underlying duplex channel failed.
    #[error("transport error: {0}")]
    Transport(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Generic --
    /// An unexpected internal error, such as the session task having exited.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for ChatError {
    fn from(e: toml::de::Error) -> Self {
        ChatError::Config(e.to_string())
    }
}
