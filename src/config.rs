// src/config.rs
//! Service configuration: optional TOML file, then environment overrides.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::upstream::RetryPolicy;

pub const ENV_CONFIG_PATH: &str = "ENRICHER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/enricher.toml";

pub const ENV_ALERTS_URL: &str = "ALERTS_FEED_URL";
pub const ENV_METADATA_URL: &str = "METADATA_FEED_URL";
pub const ENV_API_KEY: &str = "TRANSPORT_API_KEY";
pub const ENV_CACHE_TTL_SECS: &str = "ALERTS_CACHE_TTL_SECS";
pub const ENV_SERVE_STALE: &str = "ALERTS_SERVE_STALE";
pub const ENV_MAX_RETRIES: &str = "UPSTREAM_MAX_RETRIES";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnricherConfig {
    pub alerts_url: String,
    pub metadata_url: String,
    pub api_key: Option<String>,
    pub cache_ttl_secs: u64,
    /// Serve the last good feed when a refresh fails.
    pub serve_stale_on_error: bool,
    pub max_retries: u32,
    pub retry_initial_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            alerts_url: "https://api.transport.nsw.gov.au/v2/gtfs/alerts/all".into(),
            metadata_url: "https://api.transport.nsw.gov.au/v1/tp/add_info?outputFormat=rapidJSON&filterPublicationStatus=current".into(),
            api_key: None,
            cache_ttl_secs: 30,
            serve_stale_on_error: true,
            max_retries: 2,
            retry_initial_delay_ms: 250,
            request_timeout_secs: 10,
        }
    }
}

impl EnricherConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading enricher config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Resolve the config file, then apply env overrides:
    /// 1) $ENRICHER_CONFIG_PATH (must exist)
    /// 2) config/enricher.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_nonempty(ENV_ALERTS_URL) {
            self.alerts_url = v;
        }
        if let Some(v) = env_nonempty(ENV_METADATA_URL) {
            self.metadata_url = v;
        }
        if let Some(v) = env_nonempty(ENV_API_KEY) {
            self.api_key = Some(v);
        }
        if let Some(v) = env_nonempty(ENV_CACHE_TTL_SECS) {
            self.cache_ttl_secs = v
                .parse()
                .with_context(|| format!("{ENV_CACHE_TTL_SECS} must be an integer"))?;
        }
        if let Some(v) = env_nonempty(ENV_SERVE_STALE) {
            self.serve_stale_on_error = parse_flag(&v)
                .ok_or_else(|| anyhow!("{ENV_SERVE_STALE} must be a boolean flag"))?;
        }
        if let Some(v) = env_nonempty(ENV_MAX_RETRIES) {
            self.max_retries = v
                .parse()
                .with_context(|| format!("{ENV_MAX_RETRIES} must be an integer"))?;
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            ..Default::default()
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
