// ⚙️ Configuration - read once from the environment at startup

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATABASE_PATH: &str = "characters.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_HOUSE_API_URL: &str = "https://www.potterapi.com/v1";
pub const DEFAULT_HOUSE_API_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HOUSE_CACHE_CAPACITY: usize = 10_000;

/// Where validated houses are remembered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// Process memory, lost on restart
    Memory,
    /// `house_cache` table next to the characters
    Sqlite,
}

impl CacheBackend {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "sqlite" => Ok(CacheBackend::Sqlite),
            other => Err(anyhow!(
                "unknown house cache backend '{}' (expected 'memory' or 'sqlite')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_addr: String,
    pub house_api_url: String,
    /// Credential sent to the house authority with every lookup
    pub house_api_key: String,
    pub house_api_timeout: Duration,
    pub house_cache: CacheBackend,
    /// 0 means unbounded
    pub house_cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            house_api_url: DEFAULT_HOUSE_API_URL.to_string(),
            house_api_key: String::new(),
            house_api_timeout: Duration::from_secs(DEFAULT_HOUSE_API_TIMEOUT_SECS),
            house_cache: CacheBackend::Memory,
            house_cache_capacity: DEFAULT_HOUSE_CACHE_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup (unset = `None`)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(path) = lookup("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(url) = lookup("HOUSE_API_URL") {
            config.house_api_url = url;
        }
        if let Some(key) = lookup("HOUSE_API_KEY") {
            config.house_api_key = key;
        }
        if let Some(raw) = lookup("HOUSE_API_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("HOUSE_API_TIMEOUT_SECS is not a number: '{}'", raw))?;
            if secs == 0 {
                return Err(anyhow!("HOUSE_API_TIMEOUT_SECS must be greater than zero"));
            }
            config.house_api_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup("HOUSE_CACHE") {
            config.house_cache = CacheBackend::parse(&raw).context("invalid HOUSE_CACHE")?;
        }
        if let Some(raw) = lookup("HOUSE_CACHE_CAPACITY") {
            config.house_cache_capacity = raw
                .trim()
                .parse()
                .with_context(|| format!("HOUSE_CACHE_CAPACITY is not a number: '{}'", raw))?;
        }

        Ok(config)
    }
}
