use std::{collections::BTreeSet, fmt, str::FromStr, sync::OnceLock};

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use time::UtcDateTime;

/// Runtime toggles consulted by the webhook handlers.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
pub enum Flag {
    /// Create checks for every sender, not only the allow-list.
    ChecksAllUsers,
    /// Forward Azure Pipelines check_run events to the Azure integration.
    ProcessAzureCheckRunEvents,
    /// Forward Taskcluster check_suite events to the Taskcluster integration.
    ProcessTaskclusterCheckSuiteEvents,
}

impl Flag {
    pub const fn variants() -> &'static [Self] {
        &[Self::ChecksAllUsers, Self::ProcessAzureCheckRunEvents, Self::ProcessTaskclusterCheckSuiteEvents]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChecksAllUsers => "checksAllUsers",
            Self::ProcessAzureCheckRunEvents => "processAzureCheckRunEvents",
            Self::ProcessTaskclusterCheckSuiteEvents => "processTaskclusterCheckRunEvents",
        }
    }
}

impl FromStr for Flag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::variants().iter().find(|f| f.as_str() == s).copied().ok_or(())
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A check suite record, unique per (sha, owner, repo, app_id).
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct CheckSuite {
    pub sha: String,
    pub owner: String,
    pub repo: String,
    pub app_id: u64,
    pub installation_id: u64,
    pub pull_requests: Vec<u64>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EnsuredSuite {
    Created,
    Existing,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TestRun {
    pub id: i64,
    pub sha: String,
    pub spec: ProductSpec,
    pub created_at: UtcDateTime,
}

/// Stored runs for a commit, grouped under the product they were matched by.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ProductRuns {
    pub product: ProductSpec,
    pub runs: Vec<TestRun>,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ProductSpecError {
    #[error("empty product spec")]
    Empty,
    #[error("invalid browser name: {0}")]
    BrowserName(String),
    #[error("unknown browser: {0}")]
    UnknownBrowser(String),
    #[error("invalid browser version: {0}")]
    BrowserVersion(String),
    #[error("invalid OS name: {0}")]
    OsName(String),
    #[error("invalid OS version: {0}")]
    OsVersion(String),
    #[error("too many product components: {0}")]
    TooManyComponents(String),
    #[error("invalid labels: {0}")]
    Labels(String),
    #[error("invalid revision: {0}")]
    Revision(String),
}

/// A browser, optionally pinned to a version and platform.
///
/// Textual form is `browser[-version[-os[-os_version]]]`, e.g. `chrome-89-linux`.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub struct Product {
    pub browser_name: String,
    pub browser_version: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
}

impl Product {
    pub fn new(browser_name: impl Into<String>) -> Self {
        Self { browser_name: browser_name.into(), ..Default::default() }
    }

    /// Whether a run of `other` would be selected by this product filter.
    /// Versions match on whole dotted components, so `89` matches `89.0.4389.90`.
    pub fn matches(&self, other: &Product) -> bool {
        self.browser_name == other.browser_name
            && version_matches(self.browser_version.as_deref(), other.browser_version.as_deref())
            && self.os_name.as_ref().is_none_or(|os| other.os_name.as_ref() == Some(os))
            && version_matches(self.os_version.as_deref(), other.os_version.as_deref())
    }
}

fn version_matches(filter: Option<&str>, version: Option<&str>) -> bool {
    match (filter, version) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(filter), Some(version)) => version
            .strip_prefix(filter)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.')),
    }
}

impl FromStr for Product {
    type Err = ProductSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ProductSpecError::Empty);
        }
        let pieces = s.split('-').collect::<Vec<_>>();
        if pieces.len() > 4 {
            return Err(ProductSpecError::TooManyComponents(s.to_string()));
        }
        let browser_name = pieces[0].to_ascii_lowercase();
        if !is_browser_name(&browser_name) {
            return Err(ProductSpecError::BrowserName(pieces[0].to_string()));
        }
        let mut product = Product::new(browser_name);
        if let Some(&version) = pieces.get(1) {
            if !is_version(version) {
                return Err(ProductSpecError::BrowserVersion(version.to_string()));
            }
            product.browser_version = Some(version.to_string());
        }
        if let Some(&os_name) = pieces.get(2) {
            if os_name.is_empty() {
                return Err(ProductSpecError::OsName(os_name.to_string()));
            }
            product.os_name = Some(os_name.to_ascii_lowercase());
        }
        if let Some(&os_version) = pieces.get(3) {
            if !is_version(os_version) {
                return Err(ProductSpecError::OsVersion(os_version.to_string()));
            }
            product.os_version = Some(os_version.to_string());
        }
        Ok(product)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.browser_name)?;
        for part in [&self.browser_version, &self.os_name, &self.os_version].into_iter().flatten() {
            write!(f, "-{part}")?;
        }
        Ok(())
    }
}

/// A product plus optional labels and revision, e.g. `firefox-72[experimental]@0123abcdef`.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub struct ProductSpec {
    pub product: Product,
    pub labels: BTreeSet<String>,
    pub revision: Option<String>,
}

impl ProductSpec {
    pub fn new(product: Product) -> Self { Self { product, ..Default::default() } }

    pub fn browser_name(&self) -> &str { &self.product.browser_name }

    /// Whether a stored run described by `run` satisfies this spec as a filter.
    pub fn matches(&self, run: &ProductSpec) -> bool {
        self.product.matches(&run.product)
            && self.labels.is_subset(&run.labels)
            && self.revision.as_ref().is_none_or(|rev| {
                run.revision.as_ref().is_some_and(|r| r.starts_with(rev.as_str()))
            })
    }
}

impl FromStr for ProductSpec {
    type Err = ProductSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut name = s.trim();
        let mut revision = None;
        if let Some((rest, rev)) = name.rsplit_once('@') {
            if !is_revision(rev) {
                return Err(ProductSpecError::Revision(rev.to_string()));
            }
            if rev != "latest" {
                revision = Some(rev.to_ascii_lowercase());
            }
            name = rest;
        }
        let mut labels = BTreeSet::new();
        if let Some(rest) = name.strip_suffix(']') {
            let (rest, list) =
                rest.rsplit_once('[').ok_or_else(|| ProductSpecError::Labels(name.to_string()))?;
            if list.contains(['[', ']']) {
                return Err(ProductSpecError::Labels(list.to_string()));
            }
            labels = list
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect();
            name = rest;
        }
        Ok(Self { product: name.parse()?, labels, revision })
    }
}

impl fmt::Display for ProductSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.product)?;
        if !self.labels.is_empty() {
            f.write_str("[")?;
            for (i, label) in self.labels.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                f.write_str(label)?;
            }
            f.write_str("]")?;
        }
        if let Some(revision) = &self.revision {
            write!(f, "@{revision}")?;
        }
        Ok(())
    }
}

fn is_browser_name(s: &str) -> bool {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_.]*$").unwrap()).is_match(s)
}

fn is_version(s: &str) -> bool {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX
        .get_or_init(|| Regex::new(r"^[0-9]+(?:\.[0-9]+){0,3}(?:[a-z][a-z0-9]*)?$").unwrap())
        .is_match(s)
}

fn is_revision(s: &str) -> bool {
    s == "latest" || ((7..=40).contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit()))
}
