use anyhow::Context;
use wpt_checks_core::{
    models::{CheckSuite, EnsuredSuite},
    short_sha,
};

use crate::{
    dispatch::Route,
    error::CheckError,
    events::{CheckSuiteAction, CheckSuiteEvent, EventKind},
    identity::AppIdentity,
    outcome::{Ignored, Outcome},
    router::Checks,
};

impl Checks {
    /// Correlates a check suite with the pull requests it belongs to.
    ///
    /// Suites requested for a commit pushed to a fork get a twin suite on the home
    /// repository, so that results show up on the pull request there. A rerequested
    /// suite additionally reschedules processing of any results already stored for the
    /// commit.
    pub(crate) async fn handle_check_suite(
        &self,
        event: &CheckSuiteEvent,
        payload: &[u8],
    ) -> Result<Outcome, CheckError> {
        let suite = &event.check_suite;
        let sha = suite.head_sha.as_str();
        let app_id = suite.app.id;
        tracing::debug!(sha, app_id, "Check suite {} event from {}", event.action, suite.app.name);

        let identity = AppIdentity::resolve(app_id, &self.apps);
        if let Route::Handled(outcome) =
            self.dispatcher.dispatch(EventKind::CheckSuite, app_id, identity, payload).await?
        {
            return Ok(outcome);
        }
        if let Some(outcome) = self.ignore_unauthorized(&event.sender.login).await {
            return Ok(outcome);
        }
        let rerequested = match &event.action {
            CheckSuiteAction::Requested => false,
            CheckSuiteAction::Rerequested => true,
            action => {
                tracing::debug!("Skipping check suite {} action", action);
                return Ok(Outcome::Ignored(Ignored::Action(action.to_string())));
            }
        };

        let into_home: Vec<_> =
            suite.pull_requests.iter().filter(|pr| pr.base.repo_id() == self.home_repo_id).collect();
        let pr_numbers: Vec<u64> = into_home.iter().map(|pr| pr.number).collect();
        if !rerequested {
            for pr in into_home.iter().filter(|pr| pr.is_cross_fork()) {
                tracing::info!(
                    "Check suite {} is for fork PR #{}, creating a suite on the home repository",
                    short_sha(sha),
                    pr.number
                );
                self.api
                    .create_check_suite(app_id, event.installation_id(), sha, &pr_numbers)
                    .await
                    .with_context(|| {
                        format!("Failed to create check suite for {} (PR #{})", short_sha(sha), pr.number)
                    })?;
            }
        }

        let record = CheckSuite {
            sha: sha.to_string(),
            owner: event.repository.owner.login.clone(),
            repo: event.repository.name.clone(),
            app_id,
            installation_id: event.installation_id(),
            pull_requests: pr_numbers,
        };
        let ensured = self
            .suites
            .ensure_check_suite(&record)
            .await
            .with_context(|| format!("Failed to record check suite for {}", short_sha(sha)))?;
        match ensured {
            EnsuredSuite::Created => tracing::info!(
                "Created check suite for {}/{}@{} (app {})",
                record.owner,
                record.repo,
                short_sha(sha),
                app_id
            ),
            EnsuredSuite::Existing => {
                tracing::debug!("Check suite for {} already recorded", short_sha(sha))
            }
        }

        if rerequested {
            return self.reprocess(sha, &self.rerequest_products).await;
        }
        Ok(Outcome::Processed)
    }
}
