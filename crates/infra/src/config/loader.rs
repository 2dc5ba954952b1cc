//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `PUNCHBRIDGE_DB_PATH`: Database file path
//! - `PUNCHBRIDGE_DB_POOL_SIZE`: Connection pool size
//! - `PUNCHBRIDGE_SYNC_INTERVAL`: Sync interval in seconds
//! - `PUNCHBRIDGE_SYNC_ENABLED`: Whether background sync is enabled
//! - `PUNCHBRIDGE_DOUBLE_PUNCH_THRESHOLD`: Suppression window in seconds
//! - `PUNCHBRIDGE_RETENTION_DAYS`: Optional ledger retention in days
//!
//! ## File Locations
//! The loader probes `config.json`/`config.toml` and
//! `punchbridge.json`/`punchbridge.toml` in the working directory, then the
//! parent and grandparent directories.

use std::path::PathBuf;

use punchbridge_domain::constants::{DEFAULT_DOUBLE_PUNCH_THRESHOLD_SECS, MIN_SYNC_INTERVAL_SECS};
use punchbridge_domain::{
    BridgeError, Config, DatabaseConfig, IngestConfig, Result, SyncConfig,
};

/// Load configuration with automatic fallback strategy.
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `BridgeError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "environment incomplete, trying config file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables.
///
/// Only the database path is required; everything else has a default.
///
/// # Errors
/// Returns `BridgeError::Config` if `PUNCHBRIDGE_DB_PATH` is missing or a
/// present variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let db_path = env_var("PUNCHBRIDGE_DB_PATH")?;
    let pool_size = env_parse("PUNCHBRIDGE_DB_POOL_SIZE", 4)?;
    let interval_seconds = env_parse("PUNCHBRIDGE_SYNC_INTERVAL", MIN_SYNC_INTERVAL_SECS)?;
    let enabled = env_bool("PUNCHBRIDGE_SYNC_ENABLED", true);
    let double_punch_threshold_secs =
        env_parse("PUNCHBRIDGE_DOUBLE_PUNCH_THRESHOLD", DEFAULT_DOUBLE_PUNCH_THRESHOLD_SECS)?;
    let retention_days = match std::env::var("PUNCHBRIDGE_RETENTION_DAYS") {
        Ok(value) => Some(value.parse::<u32>().map_err(|e| {
            BridgeError::Config(format!("Invalid PUNCHBRIDGE_RETENTION_DAYS: {e}"))
        })?),
        Err(_) => None,
    };

    Ok(Config {
        database: DatabaseConfig { path: db_path, pool_size },
        sync: SyncConfig { interval_seconds, enabled },
        ingest: IngestConfig { double_punch_threshold_secs, retention_days },
    })
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes the standard locations. The format is
/// detected from the file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `BridgeError::Config` if no file is found, or the file fails to
/// parse.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BridgeError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BridgeError::Config("No config file found in standard locations".to_string())
        })?,
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| {
        BridgeError::Config(format!("Failed to read {}: {e}", config_path.display()))
    })?;

    let config = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str::<Config>(&contents)
            .map_err(|e| BridgeError::Config(format!("Invalid JSON config: {e}")))?,
        Some("toml") => toml::from_str::<Config>(&contents)
            .map_err(|e| BridgeError::Config(format!("Invalid TOML config: {e}")))?,
        other => {
            return Err(BridgeError::Config(format!(
                "Unsupported config format: {other:?} (expected .json or .toml)"
            )))
        }
    };

    tracing::info!(path = %config_path.display(), "configuration loaded from file");
    Ok(config)
}

fn probe_config_paths() -> Option<PathBuf> {
    let names = ["config.json", "config.toml", "punchbridge.json", "punchbridge.toml"];
    let bases = [PathBuf::from("."), PathBuf::from(".."), PathBuf::from("../..")];

    for base in &bases {
        for name in &names {
            let candidate = base.join(name);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| BridgeError::Config(format!("Missing environment variable: {name}")))
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|e| BridgeError::Config(format!("Invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}
