use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ExporterError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub pools: PoolsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoolsConfig {
    /// Comma-separated list of zpool names to monitor.
    #[serde(default = "default_pool_names")]
    pub names: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// URL path segment the metrics are exposed under, without leading slash.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProbeConfig {
    /// Deadline for a single zpool invocation before it is killed.
    #[serde(default = "default_probe_timeout")]
    pub timeout_seconds: u64,
}

fn default_pool_names() -> String {
    "tank".to_string()
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_endpoint() -> String {
    "metrics".to_string()
}

fn default_probe_timeout() -> u64 {
    10
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            names: default_pool_names(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            endpoint: default_endpoint(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_probe_timeout(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("ZPOOL_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// The validated, ordered list of pool names to monitor.
    ///
    /// Splits the comma-separated `pools.names` value, trims whitespace and
    /// drops duplicates while preserving first-seen order. An empty list or an
    /// empty name between commas is a configuration error.
    pub fn pool_names(&self) -> crate::error::Result<Vec<String>> {
        parse_pool_list(&self.pools.names)
    }
}

pub fn parse_pool_list(raw: &str) -> crate::error::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in raw.split(',') {
        let name = entry.trim();
        if name.is_empty() {
            return Err(ExporterError::Config(format!(
                "empty pool name in list '{raw}'"
            )));
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    if names.is_empty() {
        return Err(ExporterError::Config(
            "no pools configured to monitor".to_string(),
        ));
    }
    Ok(names)
}
