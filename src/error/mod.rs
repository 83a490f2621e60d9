//! Error types for decanter.

use strum::{Display, EnumString};
use thiserror::Error;

/// Protocol or API step an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    DeviceInit,
    DevicePoll,
    CodeExchange,
    TokenRefresh,
    ApiRequest,
    GradeWait,
}

/// Primary error type for all decanter operations.
#[derive(Error, Debug)]
pub enum DecanterError {
    #[error("{step} request failed: {message}")]
    RequestFailed { step: Step, message: String },

    #[error("{step} timed out after {waited_ms}ms")]
    Timeout { step: Step, waited_ms: u64 },

    #[error("Access token unavailable: {0}")]
    TokenUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Hook failed: {0}")]
    Hook(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DecanterError {
    /// Build a `RequestFailed` error for `step`.
    pub fn request_failed(step: Step, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            step,
            message: message.into(),
        }
    }

    pub fn timeout(step: Step, waited: std::time::Duration) -> Self {
        Self::Timeout {
            step,
            waited_ms: waited.as_millis() as u64,
        }
    }

    /// Map a non-success HTTP status into a `RequestFailed` error.
    pub fn unexpected_status(step: Step, status: u16) -> Self {
        Self::request_failed(step, format!("unexpected status code: {status}"))
    }

    /// The step this error is attributed to, if any.
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::RequestFailed { step, .. } | Self::Timeout { step, .. } => Some(*step),
            Self::TokenUnavailable(_) => Some(Step::TokenRefresh),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<serde_json::Error> for DecanterError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for DecanterError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for DecanterError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, DecanterError>;
