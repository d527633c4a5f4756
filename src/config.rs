use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the content management API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment queried within each space.
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per request when the API signals a rate limit.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First backoff delay; doubles on each further attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            environment: default_environment(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.contentful.com".to_string()
}
fn default_environment() -> String {
    "master".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    2000
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Entries requested per space per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Quiet period before a free-text query change triggers a search.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Limit for content-type listings.
    #[serde(default = "default_content_type_limit")]
    pub content_type_limit: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            debounce_ms: default_debounce_ms(),
            content_type_limit: default_content_type_limit(),
        }
    }
}

fn default_page_size() -> u32 {
    25
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_content_type_limit() -> u32 {
    100
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate api
    if config.api.base_url.is_empty() {
        anyhow::bail!("api.base_url must not be empty");
    }
    if config.api.environment.is_empty() {
        anyhow::bail!("api.environment must not be empty");
    }
    if config.api.max_attempts < 1 {
        anyhow::bail!("api.max_attempts must be >= 1");
    }

    // Validate search
    if config.search.page_size < 1 {
        anyhow::bail!("search.page_size must be >= 1");
    }
    if config.search.content_type_limit < 1 {
        anyhow::bail!("search.content_type_limit must be >= 1");
    }

    Ok(config)
}
