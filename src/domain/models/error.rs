use std::time::Duration;

use thiserror::Error;

/// Every failure a single action invocation can end in. Each variant carries a
/// message short enough to show to the user as-is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("AI service not configured")]
    ServiceUnavailable,

    #[error("Upstream provider returned {status}: {body}")]
    UpstreamError { status: u16, body: String },

    #[error("Upstream provider returned an unexpected response: {0}")]
    MalformedUpstreamResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Storage failure: {0}")]
    PersistenceError(String),

    #[error("Missing or invalid access token")]
    Unauthorized,
}

impl AppError {
    pub fn invalid_input(msg: &str) -> AppError {
        return AppError::InvalidInput(msg.to_string());
    }

    pub fn persistence<E: std::fmt::Display>(err: E) -> AppError {
        return AppError::PersistenceError(err.to_string());
    }

    /// Maps a transport failure from reqwest, keeping timeouts distinguishable.
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> AppError {
        if err.is_timeout() {
            return AppError::Timeout(timeout);
        }

        return AppError::NetworkError(err.to_string());
    }
}
