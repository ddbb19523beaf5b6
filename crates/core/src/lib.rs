pub mod config;
pub mod models;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Shortens a commit SHA for log output.
pub fn short_sha(sha: &str) -> &str { sha.get(..7).unwrap_or(sha) }

/// Error side of a handler result. Client errors carry the message returned to the
/// sender; internal errors answer 500 with the full context chain.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => {
                tracing::warn!("Bad request: {message}");
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            Self::Internal(err) => {
                tracing::error!("{:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err)).into_response()
            }
        }
    }
}
