//! Layered error definitions
//!
//! Categorized by source: config / engine / general

use thiserror::Error;

use crate::ChannelId;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Engine Errors =====
    /// Engine refused or failed a submission
    #[error("engine error on channel {channel}: {message}")]
    Engine { channel: ChannelId, message: String },

    /// Engine channel index out of range
    #[error("engine has no channel {channel} (channels: {channels})")]
    EngineChannel { channel: ChannelId, channels: usize },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create engine error
    pub fn engine(channel: ChannelId, message: impl Into<String>) -> Self {
        Self::Engine {
            channel,
            message: message.into(),
        }
    }
}
