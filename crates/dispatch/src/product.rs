use std::collections::HashSet;

use anyhow::{Result, ensure};
use regex::Regex;
use wpt_checks_core::models::{ProductSpec, ProductSpecError};

use crate::error::CheckError;

/// Turns check run names such as `staging.wpt.fyi - chrome[experimental]` into
/// product specs.
pub struct ProductNameResolver {
    prefix: Regex,
    browsers: HashSet<String>,
}

impl ProductNameResolver {
    /// `pattern` must capture the product part of the name in its first group.
    /// An empty `browsers` accepts any syntactically valid browser name.
    pub fn new(pattern: &str, browsers: impl IntoIterator<Item = String>) -> Result<Self> {
        let prefix = Regex::new(pattern)?;
        ensure!(prefix.captures_len() > 1, "run name pattern {pattern:?} has no capture group");
        Ok(Self { prefix, browsers: browsers.into_iter().collect() })
    }

    /// Returns the captured remainder if the name matches the prefix pattern, otherwise
    /// the name unchanged.
    pub fn strip_prefix<'a>(&self, name: &'a str) -> &'a str {
        self.prefix.captures(name).and_then(|c| c.get(1)).map_or(name, |m| m.as_str())
    }

    pub fn resolve(&self, name: &str) -> Result<ProductSpec, CheckError> {
        let name = self.strip_prefix(name);
        let invalid = |source: ProductSpecError| CheckError::InvalidProductName {
            name: name.to_string(),
            source,
        };
        let spec = name.parse::<ProductSpec>().map_err(invalid)?;
        if !self.browsers.is_empty() && !self.browsers.contains(spec.browser_name()) {
            return Err(invalid(ProductSpecError::UnknownBrowser(spec.product.browser_name)));
        }
        Ok(spec)
    }
}
