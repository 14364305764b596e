//! Client error types.

pub use reqwest::StatusCode;
use thiserror::Error;

use crate::validation::ValidationErrors;

/// Fallback shown when the server gives no usable message.
pub const GENERIC_SERVER_MESSAGE: &str = "Request failed. Please try again.";

/// Fallback shown when the request never reached the server.
pub const GENERIC_TRANSPORT_MESSAGE: &str = "Could not reach the server. Please try again.";

/// Errors surfaced by the API client.
///
/// Every variant is terminal for the action that produced it; nothing is
/// retried.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Form input rejected before any request was sent.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The server answered 401. The session has already been cleared.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success status.
    #[error("Server error ({status}): {message}")]
    Server { status: StatusCode, message: String },

    /// Network or connection failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Session storage could not be read or written.
    #[error("Session storage error: {0}")]
    Session(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for a one-line notification.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server { message, .. } | ApiError::Unauthorized(message) => message.clone(),
            ApiError::Transport(_) => GENERIC_TRANSPORT_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Session(e.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::Server {
            status: StatusCode::NOT_FOUND,
            message: "User not found".to_string(),
        };
        assert_eq!(err.to_string(), "Server error (404 Not Found): User not found");
        assert_eq!(err.user_message(), "User not found");
    }

    #[test]
    fn test_status_mapping() {
        let err = ApiError::Unauthorized("Invalid credentials".into());
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(err.user_message(), "Invalid credentials");
        assert_eq!(ApiError::Transport("refused".into()).status(), None);
    }

    #[test]
    fn test_transport_message_is_generic() {
        let err = ApiError::Transport("tcp connect error: Connection refused".into());
        assert_eq!(err.user_message(), GENERIC_TRANSPORT_MESSAGE);
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ApiError = io_err.into();
        assert!(matches!(err, ApiError::Session(_)));
    }
}
