//! Error types for sitewarden

use thiserror::Error;

/// Error type for the small parsing helpers shared across crates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WardenError {
    #[error("Invalid time '{value}': {message}")]
    InvalidTime { value: String, message: String },

    #[error("Invalid tab ID: {0}")]
    InvalidTabId(String),

    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),
}

impl WardenError {
    pub fn invalid_time(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTime {
            value: value.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WardenError>;
