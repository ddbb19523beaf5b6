use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use wpt_checks_core::AppError;
use wpt_checks_dispatch::{CheckError, Checks, Outcome};
use wpt_checks_github::webhook::GitHubEvent;

/// Handles check_suite, check_run and pull_request deliveries.
///
/// Processed events answer 200, deliberate no-ops 204. Payloads that cannot be decoded
/// are the sender's fault (400); everything else that fails is ours (500).
pub async fn webhook(
    State(checks): State<Arc<Checks>>,
    GitHubEvent { event, delivery, body }: GitHubEvent,
) -> Result<Response, AppError> {
    let outcome = checks.handle_event(&event, &body).await.map_err(check_error)?;
    Ok(match outcome {
        Outcome::Processed => {
            (StatusCode::OK, "wpt.fyi check(s) scheduled successfully").into_response()
        }
        Outcome::Ignored(reason) => {
            tracing::info!(
                "Ignored {} delivery {}: {}",
                event,
                delivery.as_deref().unwrap_or("-"),
                reason
            );
            StatusCode::NO_CONTENT.into_response()
        }
    })
}

fn check_error(err: CheckError) -> AppError {
    if err.is_client_error() {
        AppError::BadRequest(err.to_string())
    } else {
        AppError::Internal(err.into())
    }
}
