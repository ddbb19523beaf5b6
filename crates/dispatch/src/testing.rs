//! Recording fakes of every port, plus payload builders.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use time::UtcDateTime;
use wpt_checks_core::{
    config::{AppIds, ChecksConfig, DEFAULT_RUN_NAME_PATTERN},
    models::{CheckSuite, EnsuredSuite, Flag, ProductRuns, ProductSpec, TestRun},
};

use crate::{
    events::{CheckRun, EventKind},
    ports::{CheckApi, EventBackend, FeatureFlags, SuiteStore, TestRunStore},
    router::{Checks, Collaborators},
};

pub const HOME_REPO_ID: u64 = 1000;
pub const FORK_REPO_ID: u64 = 2000;
pub const OTHER_REPO_ID: u64 = 3000;
pub const HOME_APP_ID: u64 = 1;
pub const HOME_INSTALLATION_ID: u64 = 100;
pub const EVENT_INSTALLATION_ID: u64 = 42;
pub const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Call {
    CreateSuite { app_id: u64, installation_id: u64, sha: String, pr_numbers: Vec<u64> },
    EnsureSuite(CheckSuite),
    LoadRuns { sha: String, products: Vec<String> },
    Schedule { sha: String, product: String },
    IgnoreFailure { actor: String, owner: String, repo: String, run_id: u64 },
    Cancel { actor: String, owner: String, repo: String, run_id: u64 },
    Forward(EventKind, String),
}

/// Collaborator operations that can be made to fail.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Op {
    CreateSuite,
    EnsureSuite,
    LoadRuns,
    IgnoreFailure,
    Cancel,
}

struct State {
    calls: Vec<Call>,
    failing_ops: HashSet<Op>,
    flags: HashSet<Flag>,
    runs: Vec<ProductRuns>,
    suites: HashSet<(String, String, String, u64)>,
    failing_products: HashSet<String>,
    backend_result: Result<bool, String>,
    suite_created: bool,
}

pub struct Fake {
    state: Mutex<State>,
}

impl Fake {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                calls: Vec::new(),
                failing_ops: HashSet::new(),
                flags: HashSet::new(),
                runs: Vec::new(),
                suites: HashSet::new(),
                failing_products: HashSet::new(),
                backend_result: Ok(true),
                suite_created: true,
            }),
        })
    }

    pub fn with_flag(self: Arc<Self>, flag: Flag) -> Arc<Self> {
        self.state.lock().unwrap().flags.insert(flag);
        self
    }

    /// Stores `count` runs of `product` for [`SHA`].
    pub fn with_runs(self: Arc<Self>, product: &str, count: usize) -> Arc<Self> {
        let spec: ProductSpec = product.parse().unwrap();
        let runs = (0..count)
            .map(|i| TestRun {
                id: i as i64,
                sha: SHA.to_string(),
                spec: spec.clone(),
                created_at: UtcDateTime::now(),
            })
            .collect();
        self.state.lock().unwrap().runs.push(ProductRuns { product: spec, runs });
        self
    }

    pub fn failing_schedule(self: Arc<Self>, product: &str) -> Arc<Self> {
        self.state.lock().unwrap().failing_products.insert(product.to_string());
        self
    }

    /// Makes every call of `op` fail after it has been recorded.
    pub fn failing(self: Arc<Self>, op: Op) -> Arc<Self> {
        self.state.lock().unwrap().failing_ops.insert(op);
        self
    }

    pub fn set_backend_result(&self, result: Result<bool, String>) {
        self.state.lock().unwrap().backend_result = result;
    }

    pub fn set_suite_created(&self, created: bool) {
        self.state.lock().unwrap().suite_created = created;
    }

    pub fn calls(&self) -> Vec<Call> { self.state.lock().unwrap().calls.clone() }

    pub fn schedules(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Schedule { product, .. } => Some(product),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) { self.state.lock().unwrap().calls.push(call); }

    fn check(&self, op: Op) -> Result<()> {
        if self.state.lock().unwrap().failing_ops.contains(&op) {
            return Err(anyhow!("{op:?} unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl FeatureFlags for Fake {
    async fn is_enabled(&self, flag: Flag) -> bool { self.state.lock().unwrap().flags.contains(&flag) }
}

#[async_trait]
impl TestRunStore for Fake {
    async fn load_runs(&self, products: &[ProductSpec], sha: &str) -> Result<Vec<ProductRuns>> {
        let names: Vec<String> = products.iter().map(ToString::to_string).collect();
        self.record(Call::LoadRuns { sha: sha.to_string(), products: names.clone() });
        self.check(Op::LoadRuns)?;
        let state = self.state.lock().unwrap();
        if names.is_empty() {
            return Ok(state.runs.clone());
        }
        Ok(products
            .iter()
            .map(|product| ProductRuns {
                product: product.clone(),
                runs: state
                    .runs
                    .iter()
                    .filter(|g| g.product == *product)
                    .flat_map(|g| g.runs.clone())
                    .collect(),
            })
            .collect())
    }
}

#[async_trait]
impl SuiteStore for Fake {
    async fn ensure_check_suite(&self, suite: &CheckSuite) -> Result<EnsuredSuite> {
        self.record(Call::EnsureSuite(suite.clone()));
        self.check(Op::EnsureSuite)?;
        let key = (suite.sha.clone(), suite.owner.clone(), suite.repo.clone(), suite.app_id);
        Ok(if self.state.lock().unwrap().suites.insert(key) {
            EnsuredSuite::Created
        } else {
            EnsuredSuite::Existing
        })
    }
}

#[async_trait]
impl CheckApi for Fake {
    async fn create_check_suite(
        &self,
        app_id: u64,
        installation_id: u64,
        sha: &str,
        pr_numbers: &[u64],
    ) -> Result<bool> {
        self.record(Call::CreateSuite {
            app_id,
            installation_id,
            sha: sha.to_string(),
            pr_numbers: pr_numbers.to_vec(),
        });
        self.check(Op::CreateSuite)?;
        Ok(self.state.lock().unwrap().suite_created)
    }

    async fn schedule_results_processing(&self, sha: &str, product: &ProductSpec) -> Result<()> {
        let product = product.to_string();
        self.record(Call::Schedule { sha: sha.to_string(), product: product.clone() });
        if self.state.lock().unwrap().failing_products.contains(&product) {
            return Err(anyhow!("queue unavailable for {product}"));
        }
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
        self.record(Call::IgnoreFailure {
            actor: actor.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            run_id: run.id,
        });
        self.check(Op::IgnoreFailure)
    }

    async fn cancel_run(
        &self,
        actor: &str,
        owner: &str,
        repo: &str,
        run: &CheckRun,
        _installation_id: u64,
    ) -> Result<()> {
        self.record(Call::Cancel {
            actor: actor.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            run_id: run.id,
        });
        self.check(Op::Cancel)
    }

    fn home_installation(&self) -> (u64, u64) { (HOME_APP_ID, HOME_INSTALLATION_ID) }
}

#[async_trait]
impl EventBackend for Fake {
    async fn handle_event(&self, kind: EventKind, payload: &[u8]) -> Result<bool> {
        self.record(Call::Forward(kind, String::from_utf8_lossy(payload).into_owned()));
        self.state.lock().unwrap().backend_result.clone().map_err(|e| anyhow!(e))
    }
}

pub fn config() -> ChecksConfig {
    ChecksConfig {
        apps: AppIds {
            production: 1,
            staging: 2,
            staging_variant: Some(3),
            azure_pipelines: 4,
            taskcluster: 5,
        },
        allowed_senders: vec!["alice".to_string()],
        run_name_pattern: DEFAULT_RUN_NAME_PATTERN.to_string(),
        browsers: ["chrome", "edge", "firefox", "safari"].map(String::from).to_vec(),
        rerequest_products: Vec::new(),
    }
}

pub fn checks_with(fake: &Arc<Fake>, config: &ChecksConfig) -> Checks {
    Checks::new(config, HOME_REPO_ID, Collaborators {
        flags: fake.clone(),
        api: fake.clone(),
        suites: fake.clone(),
        runs: fake.clone(),
        azure_pipelines: fake.clone(),
        taskcluster: fake.clone(),
    })
    .unwrap()
}

pub fn checks(fake: &Arc<Fake>) -> Checks { checks_with(fake, &config()) }

fn repository() -> serde_json::Value {
    json!({"id": HOME_REPO_ID, "name": "wpt", "owner": {"login": "web-platform-tests"}})
}

/// `pulls` are (number, head repository ID, base repository ID).
pub fn check_suite_payload(action: &str, app_id: u64, sender: &str, pulls: &[(u64, u64, u64)]) -> Vec<u8> {
    let pull_requests: Vec<_> = pulls
        .iter()
        .map(|&(number, head, base)| {
            json!({
                "number": number,
                "head": {"sha": SHA, "repo": {"id": head}},
                "base": {"sha": "f95f852", "repo": {"id": base}},
            })
        })
        .collect();
    serde_json::to_vec(&json!({
        "action": action,
        "check_suite": {
            "id": 7,
            "head_sha": SHA,
            "app": {"id": app_id, "name": "wpt.fyi"},
            "pull_requests": pull_requests,
        },
        "repository": repository(),
        "sender": {"login": sender},
        "installation": {"id": EVENT_INSTALLATION_ID},
    }))
    .unwrap()
}

pub fn check_run_payload(
    action: &str,
    app_id: u64,
    sender: &str,
    name: &str,
    status: &str,
    requested_action: Option<&str>,
) -> Vec<u8> {
    let mut payload = json!({
        "action": action,
        "check_run": {
            "id": 99,
            "name": name,
            "head_sha": SHA,
            "status": status,
            "app": {"id": app_id, "name": "wpt.fyi"},
            "output": {"title": "Results", "summary": "1 regression"},
            "check_suite": {"id": 7},
        },
        "repository": repository(),
        "sender": {"login": sender},
        "installation": {"id": EVENT_INSTALLATION_ID},
    });
    if let Some(identifier) = requested_action {
        payload["requested_action"] = json!({"identifier": identifier});
    }
    serde_json::to_vec(&payload).unwrap()
}

/// A `None` head repository is a deleted fork.
pub fn pull_request_payload(action: &str, user: &str, head: Option<u64>, base: u64) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "action": action,
        "number": 12,
        "pull_request": {
            "number": 12,
            "user": {"login": user},
            "head": {"sha": SHA, "repo": head.map(|id| json!({"id": id}))},
            "base": {"sha": "f95f852", "repo": {"id": base}},
        },
        "repository": repository(),
        "sender": {"login": user},
    }))
    .unwrap()
}
