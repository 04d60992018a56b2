use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pairauth_core::error::CoreError;
use pairauth_core::session::SessionError;
use serde_json::json;

/// Message returned for every rejected credential, whatever the cause.
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid or expired session";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`SessionError`] for domain errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `pairauth_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Unauthorized(msg) => {
                    tracing::debug!(reason = %msg, "Request rejected");
                    unauthorized()
                }
            },

            // Not-found, expired and wrong-credential look identical to the
            // client.
            AppError::Session(err) if err.is_rejection() => {
                tracing::debug!(reason = %err, "Session rejected");
                unauthorized()
            }
            AppError::Session(err) => internal(err),

            AppError::Database(err) => internal(err),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn unauthorized() -> (StatusCode, &'static str, String) {
    (
        StatusCode::UNAUTHORIZED,
        "UNAUTHORIZED",
        UNAUTHORIZED_MESSAGE.to_string(),
    )
}

/// Log the real cause and hide it from the client.
fn internal(err: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
