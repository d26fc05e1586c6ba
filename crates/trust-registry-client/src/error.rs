//! Client error types

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors returned by [`crate::RegistryClient`]
///
/// Each server-side error kind maps to its own variant so callers can
/// tell "not there" from "not allowed" from "the upstream source failed".
#[derive(Error, Debug)]
pub enum ClientError {
    /// Artifact or user does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request was rejected as malformed (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing, invalid or expired token (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Token lacks the required role (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An upstream source could not be resolved (502)
    #[error("Upstream resolution failed: {0}")]
    Upstream(String),

    /// Registry data is structurally invalid, e.g. a dependency cycle (422)
    #[error("Structural error: {0}")]
    Structural(String),

    /// Any other non-success status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ClientError {
    /// Build the error for a non-success response
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| {
                if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    body.trim().to_string()
                }
            });

        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::BAD_REQUEST => ClientError::Validation(message),
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::BAD_GATEWAY => ClientError::Upstream(message),
            StatusCode::UNPROCESSABLE_ENTITY => ClientError::Structural(message),
            _ => ClientError::Server {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Status code reported by the server, if a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::NotFound(_) => Some(404),
            ClientError::Validation(_) => Some(400),
            ClientError::Unauthorized(_) => Some(401),
            ClientError::Forbidden(_) => Some(403),
            ClientError::Upstream(_) => Some(502),
            ClientError::Structural(_) => Some(422),
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            ClientError::Decode(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let body = r#"{"status":502,"error":"license unknown","code":"UPSTREAM_RESOLUTION_ERROR","timestamp":"2024-01-01T00:00:00Z"}"#;
        match ClientError::from_status(StatusCode::BAD_GATEWAY, body) {
            ClientError::Upstream(message) => assert_eq!(message, "license unknown"),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            ClientError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "{}"),
            ClientError::Structural(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::SERVICE_UNAVAILABLE, ""),
            ClientError::Server { status: 503, .. }
        ));
    }

    #[test]
    fn test_plain_text_body_becomes_message() {
        let err = ClientError::from_status(StatusCode::BAD_REQUEST, "  bad offset \n");
        assert_eq!(err.to_string(), "Validation error: bad offset");
        assert_eq!(err.status(), Some(400));
    }
}
