//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
///
/// Every variant maps to one status code, and every response body is
/// `{"error": "<message>"}`. The feed client shows these strings to the
/// user, so nothing internal leaks past the `Store` variant's fixed text.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No resolvable session on a request that requires one.
    #[error("login required")]
    Unauthorized,

    /// Authenticated, but not the owner of the target row.
    #[error("only the owner can delete a message")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    /// Underlying persistence failure. The cause is logged server-side;
    /// clients only see the fixed variant text.
    #[error("database error")]
    Store(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(e) => {
                error!("store error: {e:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
