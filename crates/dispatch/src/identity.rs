use std::fmt;

use wpt_checks_core::config::AppIds;

/// Which GitHub App an event's check suite or check run belongs to.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AppIdentity {
    NativeProduction,
    NativeStaging,
    /// Third wpt.fyi app ID. Its purpose is undocumented; it is only recognized when
    /// configured, and treated exactly like the other native apps.
    NativeStagingVariant,
    AzurePipelines,
    Taskcluster,
    Unknown,
}

impl AppIdentity {
    /// Resolves an app ID against the configured IDs. The first match wins if the same
    /// ID is configured twice.
    pub fn resolve(app_id: u64, apps: &AppIds) -> Self {
        if app_id == apps.production {
            Self::NativeProduction
        } else if app_id == apps.staging {
            Self::NativeStaging
        } else if apps.staging_variant == Some(app_id) {
            tracing::info!("App ID {app_id} resolved as the staging variant wpt.fyi app");
            Self::NativeStagingVariant
        } else if app_id == apps.azure_pipelines {
            Self::AzurePipelines
        } else if app_id == apps.taskcluster {
            Self::Taskcluster
        } else {
            Self::Unknown
        }
    }

    pub fn is_native(self) -> bool {
        matches!(self, Self::NativeProduction | Self::NativeStaging | Self::NativeStagingVariant)
    }
}

impl fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NativeProduction => "wpt.fyi",
            Self::NativeStaging => "staging.wpt.fyi",
            Self::NativeStagingVariant => "staging.wpt.fyi (variant)",
            Self::AzurePipelines => "Azure Pipelines",
            Self::Taskcluster => "Taskcluster",
            Self::Unknown => "unknown",
        })
    }
}
