use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Strategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

/// Tuning knobs for the aggregation engine. All have working defaults so a
/// minimal config file only needs the database URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Integration strategy used when a query does not pick one.
    #[serde(default = "default_strategy")]
    pub strategy: Strategy,
    /// Intervals longer than this contribute no energy and count as invalid.
    #[serde(default = "default_max_gap_minutes")]
    pub max_gap_minutes: u32,
    /// First year covered by period=year queries (data retention floor).
    #[serde(default = "default_epoch_year")]
    pub epoch_year: i32,
    /// Deadline for the reading-store range read.
    #[serde(default = "default_query_timeout_seconds")]
    pub query_timeout_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            max_gap_minutes: default_max_gap_minutes(),
            epoch_year: default_epoch_year(),
            query_timeout_seconds: default_query_timeout_seconds(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_api_host() -> String {
    "0.0.0.0".into()
}

fn default_api_port() -> u16 {
    8080
}

fn default_strategy() -> Strategy {
    Strategy::Trapezoidal
}

fn default_max_gap_minutes() -> u32 {
    60
}

fn default_epoch_year() -> i32 {
    2020
}

fn default_query_timeout_seconds() -> u64 {
    30
}

impl Config {
    /// Load YAML from disk; DATABASE_URL overrides whatever the file had.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            AppError::Config(format!("read {}: {}", path.as_ref().display(), e))
        })?;
        let mut cfg: Self = serde_yaml::from_str(&raw)
            .map_err(|e| AppError::Config(format!("parse config: {}", e)))?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            cfg.database.url = url;
        }

        Ok(cfg)
    }
}
