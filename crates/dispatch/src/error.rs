use thiserror::Error;
use wpt_checks_core::models::ProductSpecError;

use crate::events::EventKind;

/// Failures to perform a requested action. Deliberate no-ops are never errors; they
/// are reported as [`crate::Outcome::Ignored`].
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("malformed {event} payload: {source}")]
    MalformedPayload {
        event: EventKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse {name:?} as a product spec")]
    InvalidProductName {
        name: String,
        #[source]
        source: ProductSpecError,
    },

    /// The existing-results scan stopped at a product whose scheduling failed.
    #[error("failed to schedule results processing for {product} after scheduling {scheduled} product(s)")]
    Scheduling {
        product: String,
        scheduled: usize,
        #[source]
        source: anyhow::Error,
    },

    /// A collaborator call (GitHub, storage, alternate backend) failed.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl CheckError {
    /// Whether the failure is the sender's fault rather than ours.
    pub fn is_client_error(&self) -> bool { matches!(self, Self::MalformedPayload { .. }) }
}
