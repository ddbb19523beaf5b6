//! Webhook payload shapes for the three event kinds this service consumes.
//!
//! Only the fields the handlers read are modelled. Nested objects that GitHub may
//! omit or send as `null` default to empty values, so a missing installation reads as
//! installation `0` and a deleted fork reads as repository `0`.

use std::fmt;

use serde::Deserialize;

/// Value of the `X-GitHub-Event` header.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EventKind {
    CheckSuite,
    CheckRun,
    PullRequest,
}

impl EventKind {
    pub const fn variants() -> &'static [Self] { &[Self::CheckSuite, Self::CheckRun, Self::PullRequest] }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckSuite => "check_suite",
            Self::CheckRun => "check_run",
            Self::PullRequest => "pull_request",
        }
    }

    pub fn from_header(event: &str) -> Option<Self> {
        Self::variants().iter().find(|k| k.as_str() == event).copied()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

macro_rules! action_enum {
    ($(#[$attr:meta])* $name:ident { $($variant:ident => $text:literal),* $(,)? }) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
        #[serde(from = "String")]
        pub enum $name {
            $($variant,)*
            /// Any action this service has no transition for.
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $text,)*
                    Self::Other(action) => action,
                }
            }
        }

        impl From<String> for $name {
            fn from(action: String) -> Self {
                match action.as_str() {
                    $($text => Self::$variant,)*
                    _ => Self::Other(action),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }
    };
}

action_enum! {
    CheckSuiteAction {
        Requested => "requested",
        Rerequested => "rerequested",
        Completed => "completed",
    }
}

action_enum! {
    CheckRunAction {
        Created => "created",
        Rerequested => "rerequested",
        RequestedAction => "requested_action",
        Completed => "completed",
    }
}

action_enum! {
    PullRequestAction {
        Opened => "opened",
        Synchronize => "synchronize",
        Closed => "closed",
        Reopened => "reopened",
    }
}

action_enum! {
    /// Identifier of a button pressed on a check run (`requested_action.identifier`).
    RequestedActionId {
        Recompute => "recompute",
        Ignore => "ignore",
        Cancel => "cancel",
    }
}

action_enum! {
    CheckRunStatus {
        Queued => "queued",
        InProgress => "in_progress",
        Completed => "completed",
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub owner: User,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryRef {
    #[serde(default)]
    pub id: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct App {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Installation {
    pub id: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Branch {
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub repo: Option<RepositoryRef>,
}

impl Branch {
    pub fn repo_id(&self) -> u64 { self.repo.as_ref().map_or(0, |r| r.id) }
}

/// A pull request as referenced from a check suite.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
    #[serde(default)]
    pub head: Branch,
    #[serde(default)]
    pub base: Branch,
}

impl PullRequestRef {
    pub fn is_cross_fork(&self) -> bool { self.head.repo_id() != self.base.repo_id() }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuite {
    #[serde(default)]
    pub id: u64,
    pub head_sha: String,
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub pull_requests: Vec<PullRequestRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuiteEvent {
    pub action: CheckSuiteAction,
    pub check_suite: CheckSuite,
    pub repository: Repository,
    #[serde(default)]
    pub sender: User,
    #[serde(default)]
    pub installation: Option<Installation>,
}

impl CheckSuiteEvent {
    pub fn installation_id(&self) -> u64 { self.installation.as_ref().map_or(0, |i| i.id) }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckRunOutput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuiteRef {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRun {
    pub id: u64,
    pub name: String,
    pub head_sha: String,
    pub status: CheckRunStatus,
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub output: CheckRunOutput,
    #[serde(default)]
    pub check_suite: Option<CheckSuiteRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestedAction {
    pub identifier: RequestedActionId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRunEvent {
    pub action: CheckRunAction,
    pub check_run: CheckRun,
    #[serde(default)]
    pub requested_action: Option<RequestedAction>,
    pub repository: Repository,
    #[serde(default)]
    pub sender: User,
    #[serde(default)]
    pub installation: Option<Installation>,
}

impl CheckRunEvent {
    pub fn installation_id(&self) -> u64 { self.installation.as_ref().map_or(0, |i| i.id) }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub user: User,
    pub head: Branch,
    pub base: Branch,
}

impl PullRequest {
    pub fn is_cross_fork(&self) -> bool { self.head.repo_id() != self.base.repo_id() }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: PullRequestAction,
    pub number: u64,
    pub pull_request: PullRequest,
    pub repository: Repository,
    #[serde(default)]
    pub sender: User,
    #[serde(default)]
    pub installation: Option<Installation>,
}
