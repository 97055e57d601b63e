//! # Engine Configuration
//!
//! Database and ordering settings.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PHARMA_DB_PATH=/var/lib/pharma/pharma.db                           │
//! │     PHARMA_DISCOUNT_BPS=1500                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pharma/config.toml (Linux)                               │
//! │     ~/Library/Application Support/com.pharmanet.pharma/config.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "pharma.db"
//! max_connections = 8
//! busy_timeout_ms = 5000
//!
//! [ordering]
//! discount_threshold_units = 100
//! discount_bps = 1500
//! ```

use pharma_core::validation::validate_discount_bps;
use pharma_core::{DiscountPolicy, DiscountRate, DEFAULT_DISCOUNT_BPS, DEFAULT_DISCOUNT_THRESHOLD_UNITS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, or ":memory:".
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a write transaction waits for the write lock (milliseconds).
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("pharma.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

// =============================================================================
// Ordering Settings
// =============================================================================

/// Loyalty discount settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderingSettings {
    /// Historical shipped units a dispensary must exceed.
    #[serde(default = "default_threshold")]
    pub discount_threshold_units: i64,

    /// Discount granted above the threshold, in basis points.
    #[serde(default = "default_discount_bps")]
    pub discount_bps: u32,
}

fn default_threshold() -> i64 {
    DEFAULT_DISCOUNT_THRESHOLD_UNITS
}

fn default_discount_bps() -> u32 {
    DEFAULT_DISCOUNT_BPS
}

impl Default for OrderingSettings {
    fn default() -> Self {
        OrderingSettings {
            discount_threshold_units: default_threshold(),
            discount_bps: default_discount_bps(),
        }
    }
}

// =============================================================================
// PharmaConfig
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PharmaConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ordering: OrderingSettings,
}

impl PharmaConfig {
    /// Loads configuration: file (if present), then environment, then validation.
    ///
    /// `None` uses the platform config directory.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_path.or_else(Self::default_config_path) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Reads and parses a TOML file without applying overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.ordering.discount_threshold_units < 0 {
            return Err(ConfigError::Invalid(
                "ordering.discount_threshold_units must not be negative".into(),
            ));
        }
        validate_discount_bps(self.ordering.discount_bps)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    /// Applies `PHARMA_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("PHARMA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(raw) = lookup("PHARMA_DB_MAX_CONNECTIONS") {
            match raw.parse() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid PHARMA_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(raw) = lookup("PHARMA_DB_BUSY_TIMEOUT_MS") {
            match raw.parse() {
                Ok(ms) => self.database.busy_timeout_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring invalid PHARMA_DB_BUSY_TIMEOUT_MS"),
            }
        }

        if let Some(raw) = lookup("PHARMA_DISCOUNT_THRESHOLD") {
            match raw.parse() {
                Ok(units) => self.ordering.discount_threshold_units = units,
                Err(_) => warn!(value = %raw, "Ignoring invalid PHARMA_DISCOUNT_THRESHOLD"),
            }
        }

        if let Some(raw) = lookup("PHARMA_DISCOUNT_BPS") {
            match raw.parse() {
                Ok(bps) => self.ordering.discount_bps = bps,
                Err(_) => warn!(value = %raw, "Ignoring invalid PHARMA_DISCOUNT_BPS"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "pharmanet", "pharma")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    pub fn db_config(&self) -> DbConfig {
        let config = if self.database.path.as_os_str() == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
        };
        config.busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    pub fn discount_policy(&self) -> DiscountPolicy {
        DiscountPolicy {
            threshold_units: self.ordering.discount_threshold_units,
            rate: DiscountRate::from_bps(self.ordering.discount_bps),
        }
    }
}
