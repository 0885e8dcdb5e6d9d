use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use courier::ClientSettings;
use serde::Deserialize;

/// Contents of the `--config` file.
///
/// ```toml
/// timeout_ms = 5000
///
/// [headers]
/// accept = "application/json"
///
/// [client]
/// user_agent = "courier"
/// proxies = ["http://127.0.0.1:3128"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timeout_ms: Option<u64>,
    pub headers: BTreeMap<String, String>,
    pub client: ClientSettings,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}
