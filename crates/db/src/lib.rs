mod ports;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite, SqlitePool, migrate::MigrateDatabase};
use time::UtcDateTime;
use wpt_checks_core::{
    config::DbConfig,
    models::{CheckSuite, EnsuredSuite, Flag, Product, ProductRuns, ProductSpec, TestRun},
};

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Sqlite>,
}

/// A (sha, product) pair waiting for results processing.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PendingResult {
    pub sha: String,
    pub product: String,
    pub attempts: i64,
    pub updated_at: String,
}

impl Database {
    pub async fn new(config: &DbConfig) -> Result<Self> {
        if !Sqlite::database_exists(&config.url).await.unwrap_or(false) {
            tracing::info!(url = %config.url, "Creating database");
            Sqlite::create_database(&config.url).await.context("Failed to create database")?;
            tracing::info!("Database created");
        }
        let pool =
            SqlitePool::connect(&config.url).await.context("Failed to connect to database")?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(Self { pool })
    }

    pub async fn close(&self) { self.pool.close().await }

    pub async fn get_secret(&self, name: &str) -> Result<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM secrets WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(value)
    }

    pub async fn set_secret(&self, name: &str, value: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query(
            r#"
            INSERT INTO secrets (name, value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT (name) DO UPDATE
            SET value = EXCLUDED.value, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(name)
        .bind(value)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Flags that were never set read as disabled.
    pub async fn get_flag(&self, flag: Flag) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        let enabled = sqlx::query_scalar::<_, bool>("SELECT enabled FROM flags WHERE name = ?")
            .bind(flag.as_str())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(enabled.unwrap_or(false))
    }

    pub async fn set_flag(&self, flag: Flag, enabled: bool) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query(
            r#"
            INSERT INTO flags (name, enabled, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT (name) DO UPDATE
            SET enabled = EXCLUDED.enabled, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(flag.as_str())
        .bind(enabled)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get_flags(&self) -> Result<Vec<(Flag, bool)>> {
        let mut flags = Vec::with_capacity(Flag::variants().len());
        for &flag in Flag::variants() {
            flags.push((flag, self.get_flag(flag).await?));
        }
        Ok(flags)
    }

    /// Inserts the suite unless one already exists for (sha, owner, repo, app_id). An
    /// existing record is left untouched, including its pull request numbers.
    pub async fn ensure_check_suite(&self, suite: &CheckSuite) -> Result<EnsuredSuite> {
        let mut conn = self.pool.acquire().await?;
        let pull_requests = serde_json::to_string(&suite.pull_requests)?;
        let result = sqlx::query(
            r#"
            INSERT INTO check_suites (sha, owner, repo, app_id, installation_id, pull_requests, created_at)
            VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT (sha, owner, repo, app_id) DO NOTHING
            "#,
        )
        .bind(&suite.sha)
        .bind(&suite.owner)
        .bind(&suite.repo)
        .bind(suite.app_id as i64)
        .bind(suite.installation_id as i64)
        .bind(pull_requests)
        .execute(&mut *conn)
        .await?;
        Ok(if result.rows_affected() > 0 { EnsuredSuite::Created } else { EnsuredSuite::Existing })
    }

    pub async fn get_check_suite(
        &self,
        sha: &str,
        owner: &str,
        repo: &str,
        app_id: u64,
    ) -> Result<Option<CheckSuite>> {
        let mut conn = self.pool.acquire().await?;
        let Some((sha, owner, repo, installation_id, pull_requests)) =
            sqlx::query_as::<_, (String, String, String, i64, String)>(
                r#"
                SELECT sha, owner, repo, installation_id, pull_requests
                FROM check_suites
                WHERE sha = ? AND owner = ? AND repo = ? AND app_id = ?
                "#,
            )
            .bind(sha)
            .bind(owner)
            .bind(repo)
            .bind(app_id as i64)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };
        let pull_requests = serde_json::from_str(&pull_requests)
            .with_context(|| format!("Invalid pull requests for check suite {sha}"))?;
        Ok(Some(CheckSuite {
            sha,
            owner,
            repo,
            app_id,
            installation_id: installation_id as u64,
            pull_requests,
        }))
    }

    pub async fn insert_test_run(&self, sha: &str, spec: &ProductSpec) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO test_runs (sha, browser_name, product, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(sha)
        .bind(spec.browser_name())
        .bind(spec.to_string())
        .bind(UtcDateTime::now().unix_timestamp())
        .fetch_one(&mut *conn)
        .await?;
        Ok(id)
    }

    /// Stored runs for `sha`, oldest first, grouped under each of `products` in order.
    /// An empty `products` groups every stored run by browser name instead.
    pub async fn load_test_runs(&self, products: &[ProductSpec], sha: &str) -> Result<Vec<ProductRuns>> {
        let mut conn = self.pool.acquire().await?;
        let runs = sqlx::query_as::<_, (i64, String, String, i64)>(
            r#"
            SELECT id, sha, product, created_at
            FROM test_runs
            WHERE sha = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(sha)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(|(id, sha, product, created_at)| {
            Ok(TestRun {
                id,
                sha,
                spec: product
                    .parse()
                    .with_context(|| format!("Invalid product {product:?} for test run {id}"))?,
                created_at: UtcDateTime::from_unix_timestamp(created_at)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        if products.is_empty() {
            let mut by_browser = BTreeMap::<String, Vec<TestRun>>::new();
            for run in runs {
                by_browser.entry(run.spec.browser_name().to_string()).or_default().push(run);
            }
            return Ok(by_browser
                .into_iter()
                .map(|(browser, runs)| ProductRuns {
                    product: ProductSpec::new(Product::new(browser)),
                    runs,
                })
                .collect());
        }
        Ok(products
            .iter()
            .map(|product| ProductRuns {
                product: product.clone(),
                runs: runs.iter().filter(|run| product.matches(&run.spec)).cloned().collect(),
            })
            .collect())
    }

    /// Queues results processing for (sha, product). A pair that is already queued is
    /// re-armed instead of duplicated. Returns the number of times it has been queued.
    pub async fn enqueue_results_processing(&self, sha: &str, product: &ProductSpec) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        let attempts = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO pending_results (sha, product, attempts, created_at, updated_at)
            VALUES (?, ?, 1, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            ON CONFLICT (sha, product) DO UPDATE
            SET attempts = attempts + 1, updated_at = CURRENT_TIMESTAMP
            RETURNING attempts
            "#,
        )
        .bind(sha)
        .bind(product.to_string())
        .fetch_one(&mut *conn)
        .await?;
        Ok(attempts)
    }

    pub async fn get_pending_results(&self) -> Result<Vec<PendingResult>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, (String, String, i64, String)>(
            r#"
            SELECT sha, product, attempts, CAST(updated_at AS TEXT)
            FROM pending_results
            ORDER BY updated_at, id
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(sha, product, attempts, updated_at)| PendingResult {
                sha,
                product,
                attempts,
                updated_at,
            })
            .collect())
    }
}
