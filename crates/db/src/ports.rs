use anyhow::{Result, anyhow};
use async_trait::async_trait;
use wpt_checks_core::models::{CheckSuite, EnsuredSuite, Flag, ProductRuns, ProductSpec};
use wpt_checks_dispatch::ports::{FeatureFlags, SecretStore, SuiteStore, TestRunStore};

use crate::Database;

#[async_trait]
impl SecretStore for Database {
    async fn get_secret(&self, name: &str) -> Result<String> {
        Database::get_secret(self, name).await?.ok_or_else(|| anyhow!("Secret {name} is not set"))
    }
}

#[async_trait]
impl FeatureFlags for Database {
    async fn is_enabled(&self, flag: Flag) -> bool {
        match self.get_flag(flag).await {
            Ok(enabled) => enabled,
            Err(e) => {
                tracing::warn!("Failed to look up flag {}, treating as disabled: {:?}", flag, e);
                false
            }
        }
    }
}

#[async_trait]
impl SuiteStore for Database {
    async fn ensure_check_suite(&self, suite: &CheckSuite) -> Result<EnsuredSuite> {
        Database::ensure_check_suite(self, suite).await
    }
}

#[async_trait]
impl TestRunStore for Database {
    async fn load_runs(&self, products: &[ProductSpec], sha: &str) -> Result<Vec<ProductRuns>> {
        self.load_test_runs(products, sha).await
    }
}
