use std::{fmt::Display, sync::Arc};

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{FromRef, FromRequest, Request},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use wpt_checks_dispatch::{
    events::EventKind,
    ports::{SecretStore, WEBHOOK_SECRET_NAME},
};

/// Verify and extract a check-related GitHub webhook delivery.
///
/// The body is kept raw so that it can be forwarded verbatim to other CI integrations.
#[derive(Clone)]
#[must_use]
pub struct GitHubEvent {
    pub event: String,
    pub delivery: Option<String>,
    pub body: Bytes,
}

impl<S> FromRequest<S> for GitHubEvent
where
    Arc<dyn SecretStore>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        fn err(m: impl Display) -> Response {
            tracing::warn!("Rejecting webhook: {m}");
            (StatusCode::BAD_REQUEST, m.to_string()).into_response()
        }
        let content_type =
            req.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or_default();
        if content_type.split(';').next().map(str::trim) != Some("application/json") {
            return Err(err(format_args!("Invalid content type {content_type:?}")));
        }
        let event = req
            .headers()
            .get("X-GitHub-Event")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| err("X-GitHub-Event header missing"))?
            .to_string();
        if EventKind::from_header(&event).is_none() {
            return Err(err(format_args!("Unsupported event {event:?}")));
        }
        let delivery =
            req.headers().get("X-GitHub-Delivery").and_then(|v| v.to_str().ok()).map(String::from);
        let signature_sha256 = req
            .headers()
            .get("X-Hub-Signature-256")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| err("X-Hub-Signature-256 missing"))?
            .strip_prefix("sha256=")
            .ok_or_else(|| err("X-Hub-Signature-256 sha256= prefix missing"))?;
        let signature =
            hex::decode(signature_sha256).map_err(|_| err("X-Hub-Signature-256 malformed"))?;

        let secrets = <Arc<dyn SecretStore>>::from_ref(state);
        let secret = secrets.get_secret(WEBHOOK_SECRET_NAME).await.map_err(|e| {
            tracing::error!("Failed to get webhook secret: {e:?}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to get webhook secret").into_response()
        })?;
        let body = Bytes::from_request(req, state).await.map_err(|_| err("error reading body"))?;
        if !verify_signature(secret.as_bytes(), &body, &signature) {
            return Err(err("signature mismatch"));
        }
        tracing::debug!("Received {} delivery {}", event, delivery.as_deref().unwrap_or("(none)"));
        Ok(GitHubEvent { event, delivery, body })
    }
}

pub fn verify_signature(secret: &[u8], body: &[u8], signature: &[u8]) -> bool {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(body);
    mac.verify_slice(signature).is_ok()
}

/// `X-Hub-Signature-256` header value for `body`.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
