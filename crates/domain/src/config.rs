//! Configuration structures
//!
//! Everything except the remote endpoint has a default, so a config file only
//! needs a `[remote]` section.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_CACHE_TTL_SECS;
use crate::errors::{AmfeError, Result};

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub remote: RemoteConfig,
    #[serde(default)]
    pub offline: OfflineConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retry: RetryProfilesConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Config with defaults around the given endpoint
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            remote: RemoteConfig {
                url: url.into(),
                anon_key: anon_key.into(),
                timeout_secs: default_timeout_secs(),
            },
            offline: OfflineConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            retry: RetryProfilesConfig::default(),
            connectivity: ConnectivityConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        self.remote.validate()?;
        if self.rate_limit.max_requests == 0 {
            return Err(AmfeError::Config("rate_limit.max_requests must be greater than 0".into()));
        }
        if self.rate_limit.window_ms == 0 {
            return Err(AmfeError::Config("rate_limit.window_ms must be greater than 0".into()));
        }
        if self.offline.pool_size == 0 {
            return Err(AmfeError::Config("offline.pool_size must be greater than 0".into()));
        }
        self.retry.search.validate("retry.search")?;
        self.retry.suggestions.validate("retry.suggestions")?;
        Ok(())
    }
}

/// Remote table endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public anonymous API key
    pub anon_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RemoteConfig {
    fn validate(&self) -> Result<()> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(AmfeError::Config("remote.url is required".into()));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(AmfeError::Config(format!(
                "remote.url must be an http(s) URL, got '{}'",
                url
            )));
        }
        if self.anon_key.trim().is_empty() {
            return Err(AmfeError::Config("remote.anon_key is required".into()));
        }
        if self.timeout_secs == 0 {
            return Err(AmfeError::Config("remote.timeout_secs must be greater than 0".into()));
        }
        Ok(())
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Persistent local store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    pub enabled: bool,
    /// Database file; `None` uses `data/amfeFailureModesDB.sqlite3` under the working directory
    pub db_path: Option<PathBuf>,
    pub pool_size: u32,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self { enabled: true, db_path: None, pool_size: 4 }
    }
}

/// Fixed-window limiter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_requests: 10, window_ms: 1000 }
    }
}

/// In-memory cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: DEFAULT_CACHE_TTL_SECS }
    }
}

/// One retry profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryProfile {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

impl RetryProfile {
    fn validate(&self, name: &str) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(AmfeError::Config(format!("{}.max_attempts must be greater than 0", name)));
        }
        if self.backoff_factor <= 0.0 {
            return Err(AmfeError::Config(format!("{}.backoff_factor must be positive", name)));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(AmfeError::Config(format!(
                "{}.base_delay_ms must not exceed max_delay_ms",
                name
            )));
        }
        Ok(())
    }
}

fn default_backoff_factor() -> f64 {
    2.0
}

/// Retry profiles per call site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryProfilesConfig {
    pub search: RetryProfile,
    pub suggestions: RetryProfile,
}

impl Default for RetryProfilesConfig {
    fn default() -> Self {
        Self {
            search: RetryProfile {
                max_attempts: 3,
                base_delay_ms: 1000,
                max_delay_ms: 10_000,
                backoff_factor: 2.0,
            },
            suggestions: RetryProfile {
                max_attempts: 2,
                base_delay_ms: 500,
                max_delay_ms: 5000,
                backoff_factor: 2.0,
            },
        }
    }
}

/// Background connectivity checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Poll the backend to detect offline/online transitions
    pub check_enabled: bool,
    pub check_interval_secs: u64,
    pub check_timeout_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self { check_enabled: true, check_interval_secs: 30, check_timeout_secs: 5 }
    }
}

/// Tracing subscriber settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
