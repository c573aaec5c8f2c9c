//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Request path is not valid UTF-8 after percent-decoding.
    #[error("Invalid request path: {0}")]
    InvalidPath(String),

    /// Bind address could not be parsed.
    #[error("Invalid address: {0}")]
    Address(#[from] std::net::AddrParseError),

    /// Blocking request work panicked or was cancelled.
    #[error("Request task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::InvalidPath(path) => (
                StatusCode::BAD_REQUEST,
                json!({"error": "Invalid request path", "path": path}),
            ),
            Self::Address(_) | Self::Task(_) | Self::Io(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "Internal server error"}),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}
