//! Client-side API error types and HTTP status code mapping.

use http::StatusCode;
use serde::Deserialize;

/// Error returned by any call to the ghqc server.
///
/// Cloneable so a single fetch failure can be recorded against a graph node
/// and reported to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),
    /// Connection, timeout or transport failure before a status was received
    #[error("Network error: {0}")]
    Network(String),
    /// The server does not support this operation (501)
    #[error("Not implemented: {0}")]
    FeatureUnavailable(String),
    /// Any other non-2xx response
    #[error("{}", backend_message(.status, .message))]
    Backend { status: u16, message: Option<String> },
    /// The response body did not match the expected shape
    #[error("Failed to parse response: {0}")]
    Decode(String),
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

fn backend_message(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(msg) if !msg.trim().is_empty() => msg.clone(),
        _ => format!("request failed with status {status}"),
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

impl ApiError {
    /// Map a non-success status and its body onto the error taxonomy.
    ///
    /// The server wraps messages as `{"error": "..."}`; anything else is
    /// ignored and the generic status message is used instead.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .map(|e| e.error)
            .filter(|m| !m.trim().is_empty());

        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(
                message.unwrap_or_else(|| "request failed with status 404".to_string()),
            ),
            StatusCode::NOT_IMPLEMENTED => ApiError::FeatureUnavailable(
                message.unwrap_or_else(|| "request failed with status 501".to_string()),
            ),
            _ => ApiError::Backend {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// The message shown to a user: the raw backend message when the server
    /// sent one, otherwise a generic status line.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NotFound(msg)
            | ApiError::Network(msg)
            | ApiError::FeatureUnavailable(msg)
            | ApiError::Decode(msg)
            | ApiError::InvalidUrl(msg) => msg.clone(),
            ApiError::Backend { status, message } => backend_message(status, message),
        }
    }

    pub fn is_feature_unavailable(&self) -> bool {
        matches!(self, ApiError::FeatureUnavailable(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
