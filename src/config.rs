use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use realm_core::blob::DEFAULT_GATEWAY;
use realm_core::feed::DEFAULT_PAGE_SIZE;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub blobs: BlobsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub feeds: FeedsConfig,
}

/// Remote query and event endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlobsConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BlobsConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            gateway_url: default_gateway_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// Maximum cached blobs; `0` keeps everything.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedsConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_api_url() -> String {
    "http://127.0.0.1:5001".to_string()
}
fn default_gateway_url() -> String {
    DEFAULT_GATEWAY.to_string()
}
fn default_cache_path() -> PathBuf {
    PathBuf::from("./data/realm.sqlite")
}
fn default_max_entries() -> usize {
    2048
}
fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Config {
    /// Defaults for commands that never talk to the server.
    pub fn minimal() -> Self {
        Self {
            server: ServerConfig {
                url: String::new(),
                timeout_secs: default_timeout_secs(),
            },
            blobs: BlobsConfig::default(),
            cache: CacheConfig::default(),
            feeds: FeedsConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.server.url.trim().is_empty() {
        anyhow::bail!("server.url must not be empty");
    }

    if config.server.timeout_secs == 0 {
        anyhow::bail!("server.timeout_secs must be > 0");
    }

    if config.blobs.timeout_secs == 0 {
        anyhow::bail!("blobs.timeout_secs must be > 0");
    }

    if config.feeds.page_size == 0 {
        anyhow::bail!("feeds.page_size must be >= 1");
    }

    Ok(config)
}
