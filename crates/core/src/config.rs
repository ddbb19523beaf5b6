use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub db: DbConfig,
    pub github: GitHubConfig,
    pub checks: ChecksConfig,
    #[serde(default)]
    pub backends: BackendsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DbConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    /// Private keys for every GitHub App this service authenticates as.
    #[serde(default)]
    pub apps: Vec<GitHubAppConfig>,
    pub home: HomeRepoConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubAppConfig {
    pub id: u64,
    pub private_key: String,
}

/// The canonical repository that fork pull requests are escalated to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HomeRepoConfig {
    pub owner: String,
    pub repo: String,
    pub repo_id: u64,
    /// App and installation used when a suite has to be created on the home repository
    /// without a check_suite event to take them from.
    pub app_id: u64,
    pub installation_id: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChecksConfig {
    pub apps: AppIds,
    #[serde(default = "default_allowed_senders")]
    pub allowed_senders: Vec<String>,
    #[serde(default = "default_run_name_pattern")]
    pub run_name_pattern: String,
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
    /// Products scanned for existing results when a suite is rerequested.
    /// Empty means every product with stored runs for the commit.
    #[serde(default)]
    pub rerequest_products: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppIds {
    pub production: u64,
    pub staging: u64,
    /// A third wpt.fyi app ID seen on staging deployments. Unset means the ID is not
    /// recognized at all.
    #[serde(default)]
    pub staging_variant: Option<u64>,
    pub azure_pipelines: u64,
    pub taskcluster: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BackendsConfig {
    pub azure_pipelines: Option<BackendConfig>,
    pub taskcluster: Option<BackendConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    pub url: Url,
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

pub const DEFAULT_RUN_NAME_PATTERN: &str = r"^(?:(?:staging\.)?wpt\.fyi - )(.*)$";

fn default_run_name_pattern() -> String { DEFAULT_RUN_NAME_PATTERN.to_string() }

fn default_allowed_senders() -> Vec<String> {
    ["chromium-wpt-export-bot", "gsnedders", "jgraham", "jugglinmike", "lukebjerring", "Ms2ger"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_browsers() -> Vec<String> {
    [
        "android_webview",
        "chrome",
        "chrome_android",
        "chrome_ios",
        "chromium",
        "deno",
        "edge",
        "epiphany",
        "firefox",
        "firefox_android",
        "flow",
        "node.js",
        "safari",
        "servo",
        "uc",
        "webkitgtk",
        "wktr",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_backend_timeout() -> u64 { 30 }
