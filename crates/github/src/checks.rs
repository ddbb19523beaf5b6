use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wpt_checks_core::{
    config::HomeRepoConfig,
    models::{CheckSuite, ProductSpec},
    short_sha,
};
use wpt_checks_db::Database;
use wpt_checks_dispatch::{events::CheckRun, ports::CheckApi};

use crate::GitHub;

/// [`CheckApi`] backed by the GitHub REST API and the local database.
#[derive(Clone)]
pub struct GitHubChecks {
    github: GitHub,
    db: Database,
    home: HomeRepoConfig,
}

impl GitHubChecks {
    pub fn new(github: GitHub, db: Database, home: HomeRepoConfig) -> Self { Self { github, db, home } }
}

#[derive(Serialize)]
struct CreateCheckSuite<'a> {
    head_sha: &'a str,
}

#[derive(Deserialize)]
struct CreatedCheckSuite {
    id: u64,
}

#[derive(Debug, Serialize)]
struct UpdateCheckRun {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'static str>,
    conclusion: &'static str,
    output: CheckRunOutput,
    actions: Vec<CheckRunAction>,
}

#[derive(Debug, Serialize)]
struct CheckRunOutput {
    title: String,
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckRunAction {
    label: &'static str,
    description: &'static str,
    identifier: &'static str,
}

fn recompute_action() -> CheckRunAction {
    CheckRunAction {
        label: "Recompute",
        description: "Recompute the results for this check run",
        identifier: "recompute",
    }
}

fn ignore_failure_update(actor: &str, run: &CheckRun) -> UpdateCheckRun {
    let mut summary =
        format!("This check was marked as a success by @{actor} via the _Ignore_ action.\n\n");
    summary.push_str(run.output.summary.as_deref().unwrap_or_default());
    UpdateCheckRun {
        status: None,
        conclusion: "success",
        output: CheckRunOutput {
            title: run.output.title.clone().unwrap_or_else(|| run.name.clone()),
            summary,
            text: run.output.text.clone(),
        },
        actions: vec![recompute_action()],
    }
}

fn cancel_update(actor: &str, run: &CheckRun) -> UpdateCheckRun {
    UpdateCheckRun {
        status: Some("completed"),
        conclusion: "cancelled",
        output: CheckRunOutput {
            title: run.name.clone(),
            summary: format!("This check was cancelled by @{actor} via the _Cancel_ action."),
            text: None,
        },
        actions: vec![recompute_action()],
    }
}

impl GitHubChecks {
    async fn update_check_run(
        &self,
        owner: &str,
        repo: &str,
        run: &CheckRun,
        installation_id: u64,
        update: &UpdateCheckRun,
    ) -> Result<()> {
        let client = self.github.client_for(run.app.id, installation_id).await?;
        let route = format!("/repos/{owner}/{repo}/check-runs/{}", run.id);
        let _: serde_json::Value = client
            .patch(route, Some(update))
            .await
            .with_context(|| format!("Failed to update check run {} in {owner}/{repo}", run.id))?;
        Ok(())
    }
}

#[async_trait]
impl CheckApi for GitHubChecks {
    async fn create_check_suite(
        &self,
        app_id: u64,
        installation_id: u64,
        sha: &str,
        pr_numbers: &[u64],
    ) -> Result<bool> {
        let HomeRepoConfig { owner, repo, .. } = &self.home;
        let client = self.github.client_for(app_id, installation_id).await?;
        let created: CreatedCheckSuite = client
            .post(format!("/repos/{owner}/{repo}/check-suites"), Some(&CreateCheckSuite { head_sha: sha }))
            .await
            .with_context(|| format!("Failed to create check suite for {} in {owner}/{repo}", short_sha(sha)))?;
        tracing::info!("Created check suite {} for {} in {}/{}", created.id, short_sha(sha), owner, repo);
        self.db
            .ensure_check_suite(&CheckSuite {
                sha: sha.to_string(),
                owner: owner.clone(),
                repo: repo.clone(),
                app_id,
                installation_id,
                pull_requests: pr_numbers.to_vec(),
            })
            .await
            .context("Failed to record created check suite")?;
        Ok(true)
    }

    async fn schedule_results_processing(&self, sha: &str, product: &ProductSpec) -> Result<()> {
        let attempts = self
            .db
            .enqueue_results_processing(sha, product)
            .await
            .with_context(|| format!("Failed to enqueue {} for {}", product, short_sha(sha)))?;
        if attempts > 1 {
            tracing::info!("Re-armed results processing of {} for {} ({} attempts)", product, short_sha(sha), attempts);
        } else {
            tracing::info!("Queued results processing of {} for {}", product, short_sha(sha));
        }
        Ok(())
    }

    async fn ignore_failure(
        &self,
        actor: &str,
        owner: &str,
        repo: &str,
        run: &CheckRun,
        installation_id: u64,
    ) -> Result<()> {
        let update = ignore_failure_update(actor, run);
        self.update_check_run(owner, repo, run, installation_id, &update).await
    }

    async fn cancel_run(
        &self,
        actor: &str,
        owner: &str,
        repo: &str,
        run: &CheckRun,
        installation_id: u64,
    ) -> Result<()> {
        let update = cancel_update(actor, run);
        self.update_check_run(owner, repo, run, installation_id, &update).await
    }

    fn home_installation(&self) -> (u64, u64) { (self.home.app_id, self.home.installation_id) }
}
