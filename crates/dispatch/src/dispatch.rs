use std::{fmt, sync::Arc};

use anyhow::Context;
use wpt_checks_core::models::Flag;

use crate::{
    error::CheckError,
    events::EventKind,
    identity::AppIdentity,
    outcome::{Ignored, Outcome},
    ports::{EventBackend, FeatureFlags},
};

/// Alternate CI integrations that can consume check events instead of wpt.fyi.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Backend {
    /// Consumes check_run events.
    AzurePipelines,
    /// Consumes check_suite events.
    Taskcluster,
}

impl Backend {
    pub fn flag(self) -> Flag {
        match self {
            Self::AzurePipelines => Flag::ProcessAzureCheckRunEvents,
            Self::Taskcluster => Flag::ProcessTaskclusterCheckSuiteEvents,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AzurePipelines => "Azure Pipelines",
            Self::Taskcluster => "Taskcluster",
        })
    }
}

/// Where an event goes once its app identity is known.
#[derive(Debug)]
pub enum Route {
    /// Continue with the wpt.fyi handlers.
    Native,
    /// The event was fully handled (forwarded or ignored).
    Handled(Outcome),
}

pub struct BackendDispatcher {
    flags: Arc<dyn FeatureFlags>,
    azure_pipelines: Arc<dyn EventBackend>,
    taskcluster: Arc<dyn EventBackend>,
}

impl BackendDispatcher {
    pub fn new(
        flags: Arc<dyn FeatureFlags>,
        azure_pipelines: Arc<dyn EventBackend>,
        taskcluster: Arc<dyn EventBackend>,
    ) -> Self {
        Self { flags, azure_pipelines, taskcluster }
    }

    /// Routing table:
    ///
    /// | Identity | check_suite | check_run |
    /// |----------|-------------|-----------|
    /// | wpt.fyi (any) | native | native |
    /// | Taskcluster | forward if flag on | ignore |
    /// | Azure Pipelines | ignore | forward if flag on |
    /// | unknown | ignore | ignore |
    ///
    /// A forwarded event's result is returned as the backend reported it.
    pub async fn dispatch(
        &self,
        kind: EventKind,
        app_id: u64,
        identity: AppIdentity,
        payload: &[u8],
    ) -> Result<Route, CheckError> {
        let backend = match (kind, identity) {
            (_, identity) if identity.is_native() => return Ok(Route::Native),
            (EventKind::CheckSuite, AppIdentity::Taskcluster) => Backend::Taskcluster,
            (EventKind::CheckRun, AppIdentity::AzurePipelines) => Backend::AzurePipelines,
            _ => {
                tracing::info!("Ignoring {} App ID {}", kind, app_id);
                return Ok(Route::Handled(Outcome::Ignored(Ignored::UnknownApp { app_id })));
            }
        };
        let flag = backend.flag();
        if !self.flags.is_enabled(flag).await {
            tracing::info!("Ignoring {} {} event", backend, kind);
            return Ok(Route::Handled(Outcome::Ignored(Ignored::BackendDisabled(flag))));
        }
        let handler = match backend {
            Backend::AzurePipelines => &self.azure_pipelines,
            Backend::Taskcluster => &self.taskcluster,
        };
        let processed = handler
            .handle_event(kind, payload)
            .await
            .with_context(|| format!("{backend} failed to handle {kind} event"))?;
        Ok(Route::Handled(if processed {
            Outcome::Processed
        } else {
            Outcome::Ignored(Ignored::Declined(backend))
        }))
    }
}
