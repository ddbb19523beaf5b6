use std::{collections::HashSet, sync::Arc};

use wpt_checks_core::models::Flag;

use crate::ports::FeatureFlags;

/// Decides whether a sender may trigger wpt.fyi checks.
///
/// Enabled for everyone when [`Flag::ChecksAllUsers`] is on; otherwise only for the
/// configured logins. Staging deployments keep the flag off so that a second set of
/// checks does not show up on every pull request.
pub struct AccessGate {
    allowed: HashSet<String>,
    flags: Arc<dyn FeatureFlags>,
}

impl AccessGate {
    pub fn new(allowed: impl IntoIterator<Item = String>, flags: Arc<dyn FeatureFlags>) -> Self {
        Self { allowed: allowed.into_iter().collect(), flags }
    }

    pub async fn is_authorized(&self, login: &str) -> bool {
        self.flags.is_enabled(Flag::ChecksAllUsers).await || self.allowed.contains(login)
    }
}
