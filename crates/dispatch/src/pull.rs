use anyhow::Context;
use wpt_checks_core::short_sha;

use crate::{
    error::CheckError,
    events::{PullRequestAction, PullRequestEvent},
    outcome::{Ignored, Outcome},
    router::Checks,
};

impl Checks {
    /// Check suites are not created automatically for commits pushed to forks, so
    /// pull requests from a fork into the home repository get one created explicitly.
    pub(crate) async fn handle_pull_request(&self, event: &PullRequestEvent) -> Result<Outcome, CheckError> {
        let pr = &event.pull_request;
        if let Some(outcome) = self.ignore_unauthorized(&pr.user.login).await {
            return Ok(outcome);
        }
        match &event.action {
            PullRequestAction::Opened | PullRequestAction::Synchronize => {}
            action => {
                tracing::debug!("Skipping pull request {} action", action);
                return Ok(Outcome::Ignored(Ignored::Action(action.to_string())));
            }
        }
        if pr.base.repo_id() != self.home_repo_id {
            return Ok(Outcome::Ignored(Ignored::ForeignBaseRepository));
        }
        if !pr.is_cross_fork() {
            tracing::debug!("PR #{} is not from a fork", pr.number);
            return Ok(Outcome::Ignored(Ignored::SameRepository));
        }

        let sha = pr.head.sha.as_str();
        tracing::info!("PR #{} is from a fork, creating a check suite for {}", pr.number, short_sha(sha));
        let (app_id, installation_id) = self.api.home_installation();
        let created = self
            .api
            .create_check_suite(app_id, installation_id, sha, &[pr.number])
            .await
            .with_context(|| format!("Failed to create check suite for PR #{}", pr.number))?;
        Ok(if created { Outcome::Processed } else { Outcome::Ignored(Ignored::NothingCreated) })
    }
}

#[cfg(test)]
mod tests {
    use wpt_checks_core::models::Flag;

    use super::*;
    use crate::testing::{
        self, Call, FORK_REPO_ID, Fake, HOME_APP_ID, HOME_INSTALLATION_ID, HOME_REPO_ID, OTHER_REPO_ID, Op, SHA,
    };

    #[tokio::test]
    async fn test_fork_pull_creates_suite() {
        for action in ["opened", "synchronize"] {
            let fake = Fake::new();
            let checks = testing::checks(&fake);
            let payload = testing::pull_request_payload(action, "alice", Some(FORK_REPO_ID), HOME_REPO_ID);
            assert_eq!(checks.handle_event("pull_request", &payload).await.unwrap(), Outcome::Processed);
            assert_eq!(fake.calls(), vec![Call::CreateSuite {
                app_id: HOME_APP_ID,
                installation_id: HOME_INSTALLATION_ID,
                sha: SHA.to_string(),
                pr_numbers: vec![12],
            }]);
        }
    }

    #[tokio::test]
    async fn test_deleted_fork_counts_as_fork() {
        let fake = Fake::new();
        let checks = testing::checks(&fake);
        let payload = testing::pull_request_payload("synchronize", "alice", None, HOME_REPO_ID);
        assert_eq!(checks.handle_event("pull_request", &payload).await.unwrap(), Outcome::Processed);
        assert_eq!(fake.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_created() {
        let fake = Fake::new();
        fake.set_suite_created(false);
        let checks = testing::checks(&fake);
        let payload = testing::pull_request_payload("opened", "alice", Some(FORK_REPO_ID), HOME_REPO_ID);
        let outcome = checks.handle_event("pull_request", &payload).await.unwrap();
        assert_eq!(outcome, Outcome::Ignored(Ignored::NothingCreated));
    }

    #[tokio::test]
    async fn test_ignored_pulls() {
        let fake = Fake::new();
        let checks = testing::checks(&fake);
        let cases = [
            (
                testing::pull_request_payload("opened", "alice", Some(HOME_REPO_ID), HOME_REPO_ID),
                Ignored::SameRepository,
            ),
            (
                testing::pull_request_payload("opened", "alice", Some(FORK_REPO_ID), OTHER_REPO_ID),
                Ignored::ForeignBaseRepository,
            ),
            (
                testing::pull_request_payload("closed", "alice", Some(FORK_REPO_ID), HOME_REPO_ID),
                Ignored::Action("closed".to_string()),
            ),
            (
                testing::pull_request_payload("reopened", "alice", Some(FORK_REPO_ID), HOME_REPO_ID),
                Ignored::Action("reopened".to_string()),
            ),
            (
                testing::pull_request_payload("opened", "mallory", Some(FORK_REPO_ID), HOME_REPO_ID),
                Ignored::Unauthorized { login: "mallory".to_string() },
            ),
        ];
        for (payload, expected) in cases {
            let outcome = checks.handle_event("pull_request", &payload).await.unwrap();
            assert_eq!(outcome, Outcome::Ignored(expected));
        }
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_all_users_flag() {
        let fake = Fake::new().with_flag(Flag::ChecksAllUsers);
        let checks = testing::checks(&fake);
        let payload = testing::pull_request_payload("opened", "mallory", Some(FORK_REPO_ID), HOME_REPO_ID);
        assert_eq!(checks.handle_event("pull_request", &payload).await.unwrap(), Outcome::Processed);
    }

    #[tokio::test]
    async fn test_create_failure() {
        let fake = Fake::new().failing(Op::CreateSuite);
        let checks = testing::checks(&fake);
        let payload = testing::pull_request_payload("opened", "alice", Some(FORK_REPO_ID), HOME_REPO_ID);
        let err = checks.handle_event("pull_request", &payload).await.unwrap_err();
        assert!(matches!(err, CheckError::Collaborator(_)));
        let message = format!("{err:#}");
        assert!(message.contains("Failed to create check suite for PR #12"), "{message}");
        assert!(message.contains("CreateSuite unavailable"), "{message}");
        assert_eq!(fake.calls().len(), 1);
    }
}
