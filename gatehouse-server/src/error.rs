//! Error types for the gatehouse server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gatehouse_core::{ApprovalError, AuditError, Error as CoreError};

/// Errors that can occur when building a router.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A prefix for nesting must start with `/`.
    #[error("Invalid route prefix '{0}': must start with '/'")]
    InvalidPrefix(String),
}

/// Errors that can occur in the gatehouse server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The referenced resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request from client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Approval error: {0}")]
    Approval(#[from] ApprovalError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    /// Failure of an orchestrator administration call.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Approval(ApprovalError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Approval(ApprovalError::ChannelClosed) => StatusCode::GONE,
            ServerError::Core(CoreError::Approval(ApprovalError::ChannelClosed)) => StatusCode::GONE,
            ServerError::Core(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ServerError::Core(_) | ServerError::Audit(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
