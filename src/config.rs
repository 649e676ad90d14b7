//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/mirror.sqlite"
//!
//! [remote]
//! repo = "acme/handbook"
//! branch = "main"
//! token_env = "GITHUB_TOKEN"
//!
//! [server]
//! bind = "127.0.0.1:8080"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub remote: RemoteConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// `owner/name` of the mirrored repository.
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Name of an environment variable holding an API token, if any.
    #[serde(default)]
    pub token_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on markdown blobs fetched at once during a run.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_branch() -> String {
    "main".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_fetch_concurrency() -> usize {
    4
}

impl RemoteConfig {
    /// Read the API token from the configured environment variable.
    pub fn token(&self) -> Option<String> {
        self.token_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate remote
    let repo = config.remote.repo.trim();
    let parts: Vec<&str> = repo.split('/').collect();
    if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
        anyhow::bail!(
            "remote.repo must be of the form 'owner/name', got '{}'",
            config.remote.repo
        );
    }
    if config.remote.branch.trim().is_empty() {
        anyhow::bail!("remote.branch must not be empty");
    }
    if config.remote.timeout_secs == 0 {
        anyhow::bail!("remote.timeout_secs must be > 0");
    }
    if config.remote.fetch_concurrency == 0 {
        anyhow::bail!("remote.fetch_concurrency must be >= 1");
    }
    if !config.remote.api_base.starts_with("http://")
        && !config.remote.api_base.starts_with("https://")
    {
        anyhow::bail!("remote.api_base must be an http(s) URL");
    }

    // Validate logging
    match config.logging.format.as_str() {
        "text" | "json" => {}
        other => anyhow::bail!(
            "Unknown logging.format: '{}'. Must be text or json.",
            other
        ),
    }

    Ok(())
}
