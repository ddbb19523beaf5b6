use std::fmt;

use wpt_checks_core::models::Flag;

use crate::dispatch::Backend;

/// Result of handling one event that did not fail.
#[derive(Debug, Clone, Eq, PartialEq)]
#[must_use]
pub enum Outcome {
    /// At least one side effect was performed.
    Processed,
    /// The event was deliberately not acted upon.
    Ignored(Ignored),
}

impl Outcome {
    pub fn is_processed(&self) -> bool { matches!(self, Self::Processed) }
}

/// Why an event was not acted upon.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Ignored {
    EventType(String),
    UnknownApp { app_id: u64 },
    BackendDisabled(Flag),
    /// The alternate backend accepted the event but reported it as not processed.
    Declined(Backend),
    Unauthorized { login: String },
    Action(String),
    RequestedAction(String),
    CompletedRun,
    SameRepository,
    ForeignBaseRepository,
    NothingCreated,
    NothingScheduled,
}

impl fmt::Display for Ignored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EventType(event) => write!(f, "unhandled event type {event}"),
            Self::UnknownApp { app_id } => write!(f, "unknown app ID {app_id}"),
            Self::BackendDisabled(flag) => write!(f, "feature {flag} disabled"),
            Self::Declined(backend) => write!(f, "{backend} did not process the event"),
            Self::Unauthorized { login } => write!(f, "sender {login} not whitelisted"),
            Self::Action(action) => write!(f, "no transition for action {action}"),
            Self::RequestedAction(id) => write!(f, "unknown requested action {id}"),
            Self::CompletedRun => f.write_str("check run already completed"),
            Self::SameRepository => f.write_str("pull request is not across forks"),
            Self::ForeignBaseRepository => f.write_str("pull request targets another repository"),
            Self::NothingCreated => f.write_str("no check suite was created"),
            Self::NothingScheduled => f.write_str("no stored runs to process"),
        }
    }
}
