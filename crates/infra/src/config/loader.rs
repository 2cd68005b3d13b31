//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the process environment if one exists
//! 2. Attempts to load from environment variables
//! 3. If the required variables are missing, falls back to loading from file
//! 4. Searches multiple paths for config files (JSON and TOML)
//! 5. Validates the result either way
//!
//! ## Environment Variables
//! - `AMFE_SUPABASE_URL`: Backend project URL (required)
//! - `AMFE_SUPABASE_ANON_KEY`: Public anon key (required)
//! - `AMFE_HTTP_TIMEOUT_SECS`: Per-request timeout in seconds
//! - `AMFE_OFFLINE_ENABLED`: Whether the local store is used (true/false)
//! - `AMFE_OFFLINE_DB_PATH`: Local database file
//! - `AMFE_RATE_LIMIT_MAX_REQUESTS`: Requests per identifier per window
//! - `AMFE_RATE_LIMIT_WINDOW_MS`: Window length in milliseconds
//! - `AMFE_CACHE_TTL_SECS`: In-memory cache lifetime in seconds
//! - `AMFE_LOG_LEVEL`: Default log filter
//! - `AMFE_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./amfe.toml`, `./amfe.json`, `./config.toml`, `./config.json`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use amfe_domain::{AmfeError, Config, Result};

const CONFIG_FILE_NAMES: [&str; 4] = ["amfe.toml", "amfe.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `AmfeError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Values fail validation
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `AMFE_SUPABASE_URL` and `AMFE_SUPABASE_ANON_KEY` must be present; every
/// other variable overrides a default when set.
///
/// # Errors
/// Returns `AmfeError::Config` if required variables are missing or any
/// value is invalid.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::new(env_var("AMFE_SUPABASE_URL")?, env_var("AMFE_SUPABASE_ANON_KEY")?);

    if let Some(timeout) = env_parse("AMFE_HTTP_TIMEOUT_SECS")? {
        config.remote.timeout_secs = timeout;
    }
    config.offline.enabled = env_bool("AMFE_OFFLINE_ENABLED", config.offline.enabled);
    if let Ok(path) = std::env::var("AMFE_OFFLINE_DB_PATH") {
        config.offline.db_path = Some(PathBuf::from(path));
    }
    if let Some(max_requests) = env_parse("AMFE_RATE_LIMIT_MAX_REQUESTS")? {
        config.rate_limit.max_requests = max_requests;
    }
    if let Some(window_ms) = env_parse("AMFE_RATE_LIMIT_WINDOW_MS")? {
        config.rate_limit.window_ms = window_ms;
    }
    if let Some(ttl) = env_parse("AMFE_CACHE_TTL_SECS")? {
        config.cache.ttl_secs = ttl;
    }
    if let Ok(level) = std::env::var("AMFE_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("AMFE_LOG_JSON", config.logging.json);

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `AmfeError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid or values fail validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AmfeError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => find_config_path().ok_or_else(|| {
            AmfeError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AmfeError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AmfeError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AmfeError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(AmfeError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Search multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_path() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `AmfeError::Config` if the variable is not set or blank.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AmfeError::Config(format!("Missing required environment variable: {}", key)))
}

/// Parse an optional environment variable
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AmfeError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
