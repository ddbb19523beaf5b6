use anyhow::Context;
use wpt_checks_core::{models::ProductSpec, short_sha};

use crate::{
    dispatch::Route,
    error::CheckError,
    events::{CheckRunAction, CheckRunEvent, CheckRunStatus, EventKind, RequestedActionId},
    identity::AppIdentity,
    outcome::{Ignored, Outcome},
    router::Checks,
};

/// What a check_run event asks for.
#[derive(Debug, Clone, Eq, PartialEq)]
enum RunTransition {
    Schedule,
    IgnoreFailure,
    Cancel,
    Skip(Ignored),
}

fn transition(event: &CheckRunEvent) -> RunTransition {
    let requested = event.requested_action.as_ref().map(|a| &a.identifier);
    match (&event.action, requested) {
        (CheckRunAction::Created, _) if event.check_run.status == CheckRunStatus::Completed => {
            RunTransition::Skip(Ignored::CompletedRun)
        }
        (CheckRunAction::Created | CheckRunAction::Rerequested, _) => RunTransition::Schedule,
        (CheckRunAction::RequestedAction, Some(RequestedActionId::Recompute)) => RunTransition::Schedule,
        (CheckRunAction::RequestedAction, Some(RequestedActionId::Ignore)) => RunTransition::IgnoreFailure,
        (CheckRunAction::RequestedAction, Some(RequestedActionId::Cancel)) => RunTransition::Cancel,
        (CheckRunAction::RequestedAction, id) => RunTransition::Skip(Ignored::RequestedAction(
            id.map_or_else(String::new, ToString::to_string),
        )),
        (action, _) => RunTransition::Skip(Ignored::Action(action.to_string())),
    }
}

impl Checks {
    pub(crate) async fn handle_check_run(
        &self,
        event: &CheckRunEvent,
        payload: &[u8],
    ) -> Result<Outcome, CheckError> {
        let run = &event.check_run;
        let app_id = run.app.id;
        tracing::debug!(
            sha = run.head_sha.as_str(),
            app_id,
            "Check run {:?} {} ({})",
            run.name,
            event.action,
            run.status
        );

        let identity = AppIdentity::resolve(app_id, &self.apps);
        if let Route::Handled(outcome) =
            self.dispatcher.dispatch(EventKind::CheckRun, app_id, identity, payload).await?
        {
            return Ok(outcome);
        }
        let actor = event.sender.login.as_str();
        if let Some(outcome) = self.ignore_unauthorized(actor).await {
            return Ok(outcome);
        }

        let owner = event.repository.owner.login.as_str();
        let repo = event.repository.name.as_str();
        match transition(event) {
            RunTransition::Schedule => {
                let product = self.resolver.resolve(&run.name)?;
                self.api
                    .schedule_results_processing(&run.head_sha, &product)
                    .await
                    .with_context(|| {
                        format!("Failed to schedule processing of {} for {}", product, short_sha(&run.head_sha))
                    })?;
                tracing::info!("Scheduled processing of {} for {}", product, short_sha(&run.head_sha));
            }
            RunTransition::IgnoreFailure => {
                self.api
                    .ignore_failure(actor, owner, repo, run, event.installation_id())
                    .await
                    .with_context(|| format!("Failed to ignore failure of check run {}", run.id))?;
                tracing::info!("@{} marked check run {} as a success", actor, run.id);
            }
            RunTransition::Cancel => {
                self.api
                    .cancel_run(actor, owner, repo, run, event.installation_id())
                    .await
                    .with_context(|| format!("Failed to cancel check run {}", run.id))?;
                tracing::info!("@{} cancelled check run {}", actor, run.id);
            }
            RunTransition::Skip(reason) => {
                tracing::debug!("Skipping check run {}: {}", run.id, reason);
                return Ok(Outcome::Ignored(reason));
            }
        }
        Ok(Outcome::Processed)
    }

    /// Schedules processing for every product in `products` that already has stored
    /// runs for `sha`. An empty `products` covers every stored product.
    ///
    /// Stops at the first scheduling failure; products after it are not attempted.
    pub(crate) async fn reprocess(&self, sha: &str, products: &[ProductSpec]) -> Result<Outcome, CheckError> {
        let groups = self
            .runs
            .load_runs(products, sha)
            .await
            .with_context(|| format!("Failed to load test runs for {}", short_sha(sha)))?;
        let mut scheduled = 0;
        for group in groups.iter().filter(|g| !g.runs.is_empty()) {
            if let Err(source) = self.api.schedule_results_processing(sha, &group.product).await {
                return Err(CheckError::Scheduling { product: group.product.to_string(), scheduled, source });
            }
            scheduled += 1;
        }
        if scheduled == 0 {
            tracing::info!("No stored runs to reprocess for {}", short_sha(sha));
            return Ok(Outcome::Ignored(Ignored::NothingScheduled));
        }
        tracing::info!("Scheduled processing of {} product(s) with stored runs for {}", scheduled, short_sha(sha));
        Ok(Outcome::Processed)
    }
}

#[cfg(test)]
mod tests {
    use wpt_checks_core::models::{Flag, ProductSpec, ProductSpecError};

    use super::*;
    use crate::testing::{self, Call, Fake, Op, SHA};

    fn event(action: &str, status: &str, requested_action: Option<&str>) -> CheckRunEvent {
        let payload = testing::check_run_payload(action, 1, "alice", "wpt.fyi - chrome", status, requested_action);
        serde_json::from_slice(&payload).unwrap()
    }

    #[test]
    fn test_transitions() {
        use RunTransition::*;
        let cases = [
            ("created", "queued", None, Schedule),
            ("created", "in_progress", None, Schedule),
            ("created", "completed", None, Skip(Ignored::CompletedRun)),
            ("rerequested", "completed", None, Schedule),
            ("requested_action", "completed", Some("recompute"), Schedule),
            ("requested_action", "completed", Some("ignore"), IgnoreFailure),
            ("requested_action", "completed", Some("cancel"), Cancel),
            ("requested_action", "completed", Some("rerun"), Skip(Ignored::RequestedAction("rerun".into()))),
            ("requested_action", "completed", None, Skip(Ignored::RequestedAction(String::new()))),
            ("completed", "completed", None, Skip(Ignored::Action("completed".into()))),
            ("created", "queued", Some("cancel"), Schedule),
        ];
        for (action, status, requested, expected) in cases {
            assert_eq!(transition(&event(action, status, requested)), expected, "{action} {status} {requested:?}");
        }
    }

    #[tokio::test]
    async fn test_created_queued_schedules_once() {
        let fake = Fake::new();
        let checks = testing::checks(&fake);
        let payload = testing::check_run_payload("created", 1, "alice", "wpt.fyi - chrome-89", "queued", None);
        assert_eq!(checks.handle_event("check_run", &payload).await.unwrap(), Outcome::Processed);
        assert_eq!(fake.calls(), vec![Call::Schedule { sha: SHA.to_string(), product: "chrome-89".to_string() }]);
    }

    #[tokio::test]
    async fn test_created_completed_is_ignored() {
        let fake = Fake::new();
        let checks = testing::checks(&fake);
        let payload = testing::check_run_payload("created", 1, "alice", "wpt.fyi - chrome", "completed", None);
        let outcome = checks.handle_event("check_run", &payload).await.unwrap();
        assert_eq!(outcome, Outcome::Ignored(Ignored::CompletedRun));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_staging_run_names() {
        let fake = Fake::new();
        let checks = testing::checks(&fake);
        let payload = testing::check_run_payload(
            "requested_action",
            2,
            "alice",
            "staging.wpt.fyi - firefox[experimental]",
            "completed",
            Some("recompute"),
        );
        assert_eq!(checks.handle_event("check_run", &payload).await.unwrap(), Outcome::Processed);
        assert_eq!(fake.schedules(), ["firefox[experimental]"]);
    }

    #[tokio::test]
    async fn test_invalid_run_name() {
        let fake = Fake::new();
        let checks = testing::checks(&fake);
        let payload = testing::check_run_payload("rerequested", 1, "alice", "wpt.fyi - lynx", "completed", None);
        let err = checks.handle_event("check_run", &payload).await.unwrap_err();
        assert!(matches!(
            err,
            CheckError::InvalidProductName { source: ProductSpecError::UnknownBrowser(_), .. }
        ));
        assert!(!err.is_client_error());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scheduling_failure() {
        let fake = Fake::new().failing_schedule("chrome");
        let checks = testing::checks(&fake);
        let payload = testing::check_run_payload("created", 1, "alice", "wpt.fyi - chrome", "queued", None);
        let err = checks.handle_event("check_run", &payload).await.unwrap_err();
        assert!(matches!(err, CheckError::Collaborator(_)));
        assert!(format!("{err:#}").contains("queue unavailable"));
    }

    #[tokio::test]
    async fn test_ignore_and_cancel_actions() {
        let fake = Fake::new();
        let checks = testing::checks(&fake);
        for identifier in ["ignore", "cancel"] {
            let payload = testing::check_run_payload(
                "requested_action",
                1,
                "alice",
                "wpt.fyi - chrome",
                "completed",
                Some(identifier),
            );
            assert_eq!(checks.handle_event("check_run", &payload).await.unwrap(), Outcome::Processed);
        }
        let (owner, repo) = ("web-platform-tests".to_string(), "wpt".to_string());
        assert_eq!(fake.calls(), vec![
            Call::IgnoreFailure { actor: "alice".into(), owner: owner.clone(), repo: repo.clone(), run_id: 99 },
            Call::Cancel { actor: "alice".into(), owner, repo, run_id: 99 },
        ]);
    }

    #[tokio::test]
    async fn test_unauthorized_actor() {
        let fake = Fake::new();
        let checks = testing::checks(&fake);
        let payload = testing::check_run_payload(
            "requested_action",
            1,
            "mallory",
            "wpt.fyi - chrome",
            "completed",
            Some("ignore"),
        );
        let outcome = checks.handle_event("check_run", &payload).await.unwrap();
        assert_eq!(outcome, Outcome::Ignored(Ignored::Unauthorized { login: "mallory".into() }));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_azure_pipelines_runs() {
        let fake = Fake::new();
        let checks = testing::checks(&fake);
        let payload = testing::check_run_payload("completed", 4, "mallory", "Azure Pipelines", "completed", None);
        let outcome = checks.handle_event("check_run", &payload).await.unwrap();
        assert_eq!(outcome, Outcome::Ignored(Ignored::BackendDisabled(Flag::ProcessAzureCheckRunEvents)));

        let fake = fake.with_flag(Flag::ProcessAzureCheckRunEvents);
        let checks = testing::checks(&fake);
        assert_eq!(checks.handle_event("check_run", &payload).await.unwrap(), Outcome::Processed);
        assert!(matches!(fake.calls().as_slice(), [Call::Forward(EventKind::CheckRun, _)]));
    }

    #[tokio::test]
    async fn test_reprocess_two_of_three_products() {
        let fake = Fake::new().with_runs("chrome", 3).with_runs("safari", 1);
        let checks = testing::checks(&fake);
        let products: Vec<ProductSpec> = ["chrome", "firefox", "safari"].map(|p| p.parse().unwrap()).to_vec();
        assert_eq!(checks.reprocess(SHA, &products).await.unwrap(), Outcome::Processed);
        assert_eq!(fake.schedules(), ["chrome", "safari"]);
    }

    #[tokio::test]
    async fn test_reprocess_stops_at_first_failure() {
        let fake = Fake::new().with_runs("chrome", 3).with_runs("safari", 1).failing_schedule("chrome");
        let checks = testing::checks(&fake);
        let products: Vec<ProductSpec> = ["chrome", "firefox", "safari"].map(|p| p.parse().unwrap()).to_vec();
        match checks.reprocess(SHA, &products).await {
            Err(CheckError::Scheduling { product, scheduled, .. }) => {
                assert_eq!(product, "chrome");
                assert_eq!(scheduled, 0);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(fake.schedules(), ["chrome"]);
    }

    #[tokio::test]
    async fn test_reprocess_keeps_count_of_scheduled_products() {
        let fake = Fake::new().with_runs("chrome", 1).with_runs("safari", 1).failing_schedule("safari");
        let checks = testing::checks(&fake);
        let err = checks.reprocess(SHA, &[]).await.unwrap_err();
        assert!(matches!(err, CheckError::Scheduling { scheduled: 1, .. }));
        assert!(err.to_string().contains("after scheduling 1 product(s)"));
    }

    #[tokio::test]
    async fn test_ignore_and_cancel_failures() {
        let cases = [
            (Op::IgnoreFailure, "ignore", "Failed to ignore failure of check run 99"),
            (Op::Cancel, "cancel", "Failed to cancel check run 99"),
        ];
        for (op, identifier, context) in cases {
            let fake = Fake::new().failing(op);
            let checks = testing::checks(&fake);
            let payload = testing::check_run_payload(
                "requested_action",
                1,
                "alice",
                "wpt.fyi - chrome",
                "completed",
                Some(identifier),
            );
            let err = checks.handle_event("check_run", &payload).await.unwrap_err();
            assert!(matches!(err, CheckError::Collaborator(_)), "{identifier}");
            let message = format!("{err:#}");
            assert!(message.contains(context), "{message}");
            assert!(message.contains(&format!("{op:?} unavailable")), "{message}");
            assert_eq!(fake.calls().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_reprocess_load_failure() {
        let fake = Fake::new().with_runs("chrome", 1).failing(Op::LoadRuns);
        let checks = testing::checks(&fake);
        let err = checks.reprocess(SHA, &[]).await.unwrap_err();
        assert!(matches!(err, CheckError::Collaborator(_)));
        let message = format!("{err:#}");
        assert!(message.contains("Failed to load test runs for 0123456"), "{message}");
        assert!(message.contains("LoadRuns unavailable"), "{message}");
        assert!(fake.schedules().is_empty());
    }
}
