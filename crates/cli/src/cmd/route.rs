use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use argp::FromArgs;
use async_trait::async_trait;
use wpt_checks_core::{
    config::{Config, HomeRepoConfig},
    models::{CheckSuite, EnsuredSuite, Flag, ProductRuns, ProductSpec},
    short_sha,
};
use wpt_checks_db::Database;
use wpt_checks_dispatch::{
    Checks, Collaborators, Outcome,
    events::{CheckRun, EventKind},
    ports::{CheckApi, EventBackend, FeatureFlags, SuiteStore, TestRunStore},
};

#[derive(FromArgs, PartialEq, Debug)]
/// Run a webhook payload through the event router without side effects.
#[argp(subcommand, name = "route")]
pub struct Args {
    #[argp(positional)]
    /// X-GitHub-Event value (check_suite, check_run or pull_request)
    event: String,
    #[argp(positional)]
    /// JSON payload file
    payload: PathBuf,
}

/// Reads flags and stored runs from the database; logs every write instead of
/// performing it.
struct DryRun {
    db: Database,
    home: HomeRepoConfig,
}

#[async_trait]
impl FeatureFlags for DryRun {
    async fn is_enabled(&self, flag: Flag) -> bool { self.db.is_enabled(flag).await }
}

#[async_trait]
impl TestRunStore for DryRun {
    async fn load_runs(&self, products: &[ProductSpec], sha: &str) -> Result<Vec<ProductRuns>> {
        self.db.load_test_runs(products, sha).await
    }
}

#[async_trait]
impl SuiteStore for DryRun {
    async fn ensure_check_suite(&self, suite: &CheckSuite) -> Result<EnsuredSuite> {
        let existing = self.db.get_check_suite(&suite.sha, &suite.owner, &suite.repo, suite.app_id).await?;
        tracing::info!(
            "[dry run] ensure check suite {}/{}@{} app={} prs={:?}",
            suite.owner,
            suite.repo,
            short_sha(&suite.sha),
            suite.app_id,
            suite.pull_requests
        );
        Ok(if existing.is_some() { EnsuredSuite::Existing } else { EnsuredSuite::Created })
    }
}

#[async_trait]
impl CheckApi for DryRun {
    async fn create_check_suite(
        &self,
        app_id: u64,
        installation_id: u64,
        sha: &str,
        pr_numbers: &[u64],
    ) -> Result<bool> {
        tracing::info!(
            "[dry run] create check suite on {}/{}@{} app={} installation={} prs={:?}",
            self.home.owner,
            self.home.repo,
            short_sha(sha),
            app_id,
            installation_id,
            pr_numbers
        );
        Ok(true)
    }

    async fn schedule_results_processing(&self, sha: &str, product: &ProductSpec) -> Result<()> {
        tracing::info!("[dry run] schedule results processing of {} for {}", product, short_sha(sha));
        Ok(())
    }

    async fn ignore_failure(
        &self,
        actor: &str,
        owner: &str,
        repo: &str,
        run: &CheckRun,
        _installation_id: u64,
    ) -> Result<()> {
        tracing::info!("[dry run] @{} ignores failure of {}/{} check run {}", actor, owner, repo, run.id);
        Ok(())
    }

    async fn cancel_run(
        &self,
        actor: &str,
        owner: &str,
        repo: &str,
        run: &CheckRun,
        _installation_id: u64,
    ) -> Result<()> {
        tracing::info!("[dry run] @{} cancels {}/{} check run {}", actor, owner, repo, run.id);
        Ok(())
    }

    fn home_installation(&self) -> (u64, u64) { (self.home.app_id, self.home.installation_id) }
}

#[async_trait]
impl EventBackend for DryRun {
    async fn handle_event(&self, kind: EventKind, payload: &[u8]) -> Result<bool> {
        tracing::info!("[dry run] forward {} event ({} bytes)", kind, payload.len());
        Ok(true)
    }
}

pub async fn run(args: Args, config: &Config) -> Result<()> {
    let payload = std::fs::read(&args.payload)
        .with_context(|| format!("Failed to read {}", args.payload.display()))?;
    let db = Database::new(&config.db).await?;
    let dry_run = Arc::new(DryRun { db: db.clone(), home: config.github.home.clone() });
    let checks = Checks::new(&config.checks, config.github.home.repo_id, Collaborators {
        flags: dry_run.clone(),
        api: dry_run.clone(),
        suites: dry_run.clone(),
        runs: dry_run.clone(),
        azure_pipelines: dry_run.clone(),
        taskcluster: dry_run,
    })?;
    let result = checks.handle_event(&args.event, &payload).await;
    db.close().await;
    match result? {
        Outcome::Processed => println!("processed"),
        Outcome::Ignored(reason) => println!("ignored: {reason}"),
    }
    Ok(())
}
