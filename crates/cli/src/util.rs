use std::{fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result};
use wpt_checks_core::{
    config::Config,
    models::{Flag, ProductSpec},
};

// For argp::FromArgs
pub fn flag(value: &str) -> Result<Flag, String> {
    Flag::from_str(value).map_err(|()| {
        let names = Flag::variants().iter().map(Flag::as_str).collect::<Vec<_>>().join(", ");
        format!("unknown flag {value:?} (expected one of {names})")
    })
}

// For argp::FromArgs
pub fn product(value: &str) -> Result<ProductSpec, String> {
    value.parse().map_err(|e| format!("invalid product {value:?}: {e}"))
}

// For argp::FromArgs
pub fn sha(value: &str) -> Result<String, String> {
    if value.len() == 40 && value.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(value.to_ascii_lowercase())
    } else {
        Err(format!("expected a full 40 character commit SHA, got {value:?}"))
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_yaml::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}
