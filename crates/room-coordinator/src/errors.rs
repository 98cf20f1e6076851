//! Room Coordinator error types.
//!
//! Protocol-level outcomes (wrong password, not started, waiting) are named
//! server events, not errors; see `protocol`. The types here cover the two
//! places a real failure can surface: the coordinator actor's request plumbing
//! (mapped to WebSocket close codes when the gateway must drop a connection)
//! and the HTTP credential endpoint (mapped to status codes). Internal details
//! are logged server-side but not exposed to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Coordinator error type.
///
/// Maps to WebSocket close codes when a connection must be terminated:
/// - `ShuttingDown`: 1013 (try again later)
/// - `Internal`: 1011 (internal error)
/// - everything else: 1008 (policy violation)
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Room not found.
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// Session not found.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Conflict error (e.g., room already exists).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Coordinator is draining (graceful shutdown).
    #[error("Coordinator is shutting down")]
    ShuttingDown,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoordinatorError {
    /// Returns the WebSocket close code for this error.
    pub fn close_code(&self) -> u16 {
        match self {
            CoordinatorError::ShuttingDown => 1013,
            CoordinatorError::Internal(_) => 1011,
            CoordinatorError::RoomNotFound(_)
            | CoordinatorError::SessionNotFound(_)
            | CoordinatorError::Conflict(_) => 1008,
        }
    }

    /// Returns a client-safe message (no internal details).
    pub fn client_message(&self) -> String {
        match self {
            CoordinatorError::RoomNotFound(_) => "Room not found".to_string(),
            CoordinatorError::SessionNotFound(_) => "Session not found".to_string(),
            CoordinatorError::Conflict(msg) => msg.clone(),
            CoordinatorError::ShuttingDown => {
                "Server is shutting down, please reconnect".to_string()
            }
            CoordinatorError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

/// Credential endpoint error type.
///
/// Maps to HTTP status codes:
/// - `BadRequest`: 400 Bad Request
/// - `NotConfigured`: 503 Service Unavailable
/// - `Signing`: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Media credential issuance is not configured")]
    NotConfigured,

    #[error("Credential signing failed: {0}")]
    Signing(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for CredentialError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            CredentialError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            CredentialError::NotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "NOT_CONFIGURED",
                "Media credential issuance is not configured".to_string(),
            ),
            CredentialError::Signing(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "rc.http", error = %err, "Credential signing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SIGNING_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}
