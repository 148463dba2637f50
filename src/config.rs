//! TOML configuration for authburst.
//!
//! Layered: the file named by `AUTHBURST_CONFIG`, then
//! `/etc/authburst/authburst.toml`, then compiled-in defaults. Command-line
//! flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::detect::DetectionParams;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "AUTHBURST_CONFIG";

const SYSTEM_CONFIG_PATH: &str = "/etc/authburst/authburst.toml";

/// Invalid detection settings. Fatal before any detection runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("threshold must be at least 1, got {0}")]
    NonPositiveThreshold(i64),
    #[error("window must be positive, got {0}s")]
    NonPositiveWindow(i64),
    #[error("window of {0} minutes is out of range")]
    WindowOutOfRange(i64),
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Try `$AUTHBURST_CONFIG`, then the system path, then defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "AUTHBURST_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Year assumed for syslog timestamps, which carry none.
    pub assumed_year: i32,
    /// Cluster window in minutes, anchored at the cluster's first attempt.
    pub window_minutes: i64,
    /// Minimum attempts for a cluster to count as an incident.
    pub threshold: i64,
    /// Upper bound on concurrent detector tasks in parallel mode.
    pub max_workers: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            assumed_year: 2025,
            window_minutes: 10,
            threshold: 5,
            max_workers: 4,
        }
    }
}

impl DetectorConfig {
    /// Validate window and threshold.
    pub fn params(&self) -> Result<DetectionParams, ConfigError> {
        DetectionParams::from_minutes(self.window_minutes, self.threshold)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where the incident list is written as JSON.
    pub incidents_path: PathBuf,
    /// Incidents shown in the console preview.
    pub preview: usize,
    /// Origins shown in the top-attacker table and chart.
    pub top_n: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            incidents_path: PathBuf::from("bruteforce_incidents.json"),
            preview: 5,
            top_n: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/authburst.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level, used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON log lines instead of the human format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
