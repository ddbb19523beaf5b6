//! Collaborators the event handlers depend on.
//!
//! Implementations live in the storage and GitHub crates; the handlers only ever hold
//! them as `Arc<dyn ...>`. Every method is awaited before the webhook is answered, and
//! any error is propagated to the caller as-is (no local retries; GitHub redelivers).

use anyhow::Result;
use async_trait::async_trait;
use wpt_checks_core::models::{CheckSuite, EnsuredSuite, Flag, ProductRuns, ProductSpec};

use crate::events::{CheckRun, EventKind};

/// Name of the secret holding the webhook HMAC key.
pub const WEBHOOK_SECRET_NAME: &str = "github-check-webhook-secret";

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<String>;
}

#[async_trait]
pub trait FeatureFlags: Send + Sync {
    /// Lookup failures read as disabled.
    async fn is_enabled(&self, flag: Flag) -> bool;
}

#[async_trait]
pub trait TestRunStore: Send + Sync {
    /// Stored runs for `sha`, grouped per product in the order of `products`.
    /// An empty `products` groups every stored run by browser.
    async fn load_runs(&self, products: &[ProductSpec], sha: &str) -> Result<Vec<ProductRuns>>;
}

#[async_trait]
pub trait SuiteStore: Send + Sync {
    /// Records the suite unless one already exists for (sha, owner, repo, app_id).
    async fn ensure_check_suite(&self, suite: &CheckSuite) -> Result<EnsuredSuite>;
}

/// Operations against the home repository's checks on GitHub.
#[async_trait]
pub trait CheckApi: Send + Sync {
    /// Asks GitHub for a check suite on the home repository. Returns whether one was
    /// created (or already existed upstream).
    async fn create_check_suite(
        &self,
        app_id: u64,
        installation_id: u64,
        sha: &str,
        pr_numbers: &[u64],
    ) -> Result<bool>;

    async fn schedule_results_processing(&self, sha: &str, product: &ProductSpec) -> Result<()>;

    async fn ignore_failure(
        &self,
        actor: &str,
        owner: &str,
        repo: &str,
        run: &CheckRun,
        installation_id: u64,
    ) -> Result<()>;

    async fn cancel_run(
        &self,
        actor: &str,
        owner: &str,
        repo: &str,
        run: &CheckRun,
        installation_id: u64,
    ) -> Result<()>;

    /// App and installation IDs for the home repository.
    fn home_installation(&self) -> (u64, u64);
}

/// An alternate CI integration consuming raw webhook payloads.
#[async_trait]
pub trait EventBackend: Send + Sync {
    /// Returns whether the backend processed the event.
    async fn handle_event(&self, kind: EventKind, payload: &[u8]) -> Result<bool>;
}
