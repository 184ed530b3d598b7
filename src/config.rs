use anyhow::{Context, Result, anyhow};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::domain::email::MetadataProfile;
use crate::ingest::RetryPolicy;

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8001";
const APP_DIR: &str = "mail_ingest";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub watch_dir: Option<String>,
    pub service_url: String,
    pub index_path: Option<String>,
    pub variant: MetadataProfile,
    /// Pause before reading a freshly created file.
    pub grace_ms: u64,
    pub timeout_secs: u64,
    pub health_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_dir: None,
            service_url: DEFAULT_SERVICE_URL.to_string(),
            index_path: None,
            variant: MetadataProfile::default(),
            grace_ms: 1000,
            timeout_secs: 30,
            health_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl Config {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.health_attempts.max(1),
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    /// Parsed, with any trailing `/` removed.
    pub fn service_url(&self) -> Result<String> {
        let url = Url::parse(&self.service_url)
            .map_err(|e| anyhow!("Invalid service_url '{}': {e}", self.service_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("service_url must be http or https: {url}"));
        }
        Ok(url.as_str().trim_end_matches('/').to_string())
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow!("no config dir available"))?
        .join(APP_DIR))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn default_index_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("processed_emails.json"))
}

pub fn default_watch_dir() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or_else(|| anyhow!("no home dir available"))?
        .join("Emails"))
}

/// Loads the config at the default location, writing a template there first
/// if none exists.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        let sample = Config::default();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config dir {}", parent.display()))?;
        }
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(path, tom).with_context(|| format!("write {}", path.display()))?;
        info!("Created template config at {}", path.display());
        return Ok(sample);
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

pub fn resolve_index_path(cfg: &Config) -> Result<PathBuf> {
    if let Some(p) = &cfg.index_path {
        Ok(PathBuf::from(p))
    } else {
        default_index_path()
    }
}

pub fn resolve_watch_dir(cfg: &Config) -> Result<PathBuf> {
    if let Some(p) = &cfg.watch_dir {
        Ok(PathBuf::from(p))
    } else {
        default_watch_dir()
    }
}
