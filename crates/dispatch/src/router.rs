use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use wpt_checks_core::{
    config::{AppIds, ChecksConfig},
    models::ProductSpec,
};

use crate::{
    dispatch::BackendDispatcher,
    error::CheckError,
    events::EventKind,
    gate::AccessGate,
    outcome::{Ignored, Outcome},
    ports::{CheckApi, EventBackend, FeatureFlags, SuiteStore, TestRunStore},
    product::ProductNameResolver,
};

/// Everything the handlers call out to.
pub struct Collaborators {
    pub flags: Arc<dyn FeatureFlags>,
    pub api: Arc<dyn CheckApi>,
    pub suites: Arc<dyn SuiteStore>,
    pub runs: Arc<dyn TestRunStore>,
    /// Receives check_run events from the Azure Pipelines app.
    pub azure_pipelines: Arc<dyn EventBackend>,
    /// Receives check_suite events from the Taskcluster app.
    pub taskcluster: Arc<dyn EventBackend>,
}

/// Entry point for check-related webhook events.
///
/// Holds no per-event state; one instance serves every request.
pub struct Checks {
    pub(crate) gate: AccessGate,
    pub(crate) resolver: ProductNameResolver,
    pub(crate) dispatcher: BackendDispatcher,
    pub(crate) apps: AppIds,
    pub(crate) home_repo_id: u64,
    pub(crate) rerequest_products: Vec<ProductSpec>,
    pub(crate) api: Arc<dyn CheckApi>,
    pub(crate) suites: Arc<dyn SuiteStore>,
    pub(crate) runs: Arc<dyn TestRunStore>,
}

impl Checks {
    pub fn new(config: &ChecksConfig, home_repo_id: u64, collaborators: Collaborators) -> Result<Self> {
        let resolver = ProductNameResolver::new(&config.run_name_pattern, config.browsers.iter().cloned())
            .context("Invalid run name pattern")?;
        let rerequest_products = config
            .rerequest_products
            .iter()
            .map(|p| p.parse::<ProductSpec>().with_context(|| format!("Invalid rerequest product {p:?}")))
            .collect::<Result<Vec<_>>>()?;
        let Collaborators { flags, api, suites, runs, azure_pipelines, taskcluster } = collaborators;
        Ok(Self {
            gate: AccessGate::new(config.allowed_senders.iter().cloned(), flags.clone()),
            resolver,
            dispatcher: BackendDispatcher::new(flags, azure_pipelines, taskcluster),
            apps: config.apps.clone(),
            home_repo_id,
            rerequest_products,
            api,
            suites,
            runs,
        })
    }

    /// Handles one webhook delivery. `event` is the `X-GitHub-Event` header value.
    ///
    /// Event types other than check_suite, check_run and pull_request are ignored.
    pub async fn handle_event(&self, event: &str, payload: &[u8]) -> Result<Outcome, CheckError> {
        let Some(kind) = EventKind::from_header(event) else {
            tracing::info!("Ignoring {} event", event);
            return Ok(Outcome::Ignored(Ignored::EventType(event.to_string())));
        };
        match kind {
            EventKind::CheckSuite => self.handle_check_suite(&parse(kind, payload)?, payload).await,
            EventKind::CheckRun => self.handle_check_run(&parse(kind, payload)?, payload).await,
            EventKind::PullRequest => self.handle_pull_request(&parse(kind, payload)?).await,
        }
    }

    pub(crate) async fn ignore_unauthorized(&self, login: &str) -> Option<Outcome> {
        if self.gate.is_authorized(login).await {
            return None;
        }
        tracing::info!("Sender {} not whitelisted for wpt.fyi checks", login);
        Some(Outcome::Ignored(Ignored::Unauthorized { login: login.to_string() }))
    }
}

fn parse<T: DeserializeOwned>(kind: EventKind, payload: &[u8]) -> Result<T, CheckError> {
    serde_json::from_slice(payload).map_err(|source| CheckError::MalformedPayload { event: kind, source })
}
