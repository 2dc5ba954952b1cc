//! Application configuration types

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DOUBLE_PUNCH_THRESHOLD_SECS, MIN_SYNC_INTERVAL_SECS};

/// Top-level configuration for the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Local ledger database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: String,
    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

/// Background sync scheduling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between scheduled cycles; clamped to a 60s floor.
    #[serde(default = "default_sync_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { interval_seconds: default_sync_interval(), enabled: true }
    }
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Double-punch suppression window in seconds; 0 disables the filter.
    #[serde(default = "default_double_punch_threshold")]
    pub double_punch_threshold_secs: u64,
    /// When set, events older than this many days are eligible for the
    /// retention cleanup.
    #[serde(default)]
    pub retention_days: Option<u32>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            double_punch_threshold_secs: default_double_punch_threshold(),
            retention_days: None,
        }
    }
}

fn default_pool_size() -> u32 {
    4
}

fn default_sync_interval() -> u64 {
    MIN_SYNC_INTERVAL_SECS
}

fn default_double_punch_threshold() -> u64 {
    DEFAULT_DOUBLE_PUNCH_THRESHOLD_SECS
}

fn default_true() -> bool {
    true
}
