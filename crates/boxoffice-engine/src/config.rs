//! # Box Office Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BOXOFFICE_DB_PATH=/var/lib/boxoffice/boxoffice.db                  │
//! │     PAYSTACK_SECRET_KEY=sk_live_...                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/boxoffice/boxoffice.toml (Linux)                         │
//! │     ~/Library/Application Support/io.boxoffice.boxoffice/... (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "boxoffice.db"
//! max_connections = 5
//!
//! [payment]
//! provider = "paystack"          # paystack | mock
//! base_url = "https://api.paystack.co"
//! secret_key = "sk_test_xxx"
//! timeout_secs = 10
//! confirmation = "synchronous"   # synchronous | deferred
//!
//! [sweeper]
//! interval_secs = 86400
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Database Settings
// =============================================================================

/// Where the store lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path. Default: `boxoffice.db` in the platform data dir.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("io", "boxoffice", "boxoffice")
        .map(|dirs| dirs.data_dir().join("boxoffice.db"))
        .unwrap_or_else(|| PathBuf::from("boxoffice.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Payment Settings
// =============================================================================

/// Which gateway implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    /// Requires `secret_key`; a config without one fails validation.
    #[default]
    Paystack,
    /// Approves everything. Tests and local development opt in explicitly.
    Mock,
}

impl std::str::FromStr for PaymentProvider {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paystack" => Ok(PaymentProvider::Paystack),
            "mock" => Ok(PaymentProvider::Mock),
            other => Err(EngineError::Config(format!(
                "Unknown payment provider: '{}'. Valid options: paystack, mock",
                other
            ))),
        }
    }
}

/// When a payment counts as confirmed.
///
/// ```text
/// SYNCHRONOUS (default)                 DEFERRED
/// ─────────────────────                 ────────
/// authorize ─► confirm(reference)       authorize
///           └► commit ticket            └► commit ticket with reference,
///                                          reconciled later by a webhook
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentConfirmation {
    #[default]
    Synchronous,
    Deferred,
}

impl std::str::FromStr for PaymentConfirmation {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "synchronous" | "sync" => Ok(PaymentConfirmation::Synchronous),
            "deferred" | "webhook" => Ok(PaymentConfirmation::Deferred),
            other => Err(EngineError::Config(format!(
                "Unknown payment confirmation mode: '{}'. Valid options: synchronous, deferred",
                other
            ))),
        }
    }
}

/// Payment gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettings {
    #[serde(default)]
    pub provider: PaymentProvider,

    /// Provider API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer secret. Required for `paystack`.
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Upper bound on each gateway call (seconds).
    #[serde(default = "default_payment_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub confirmation: PaymentConfirmation,
}

fn default_base_url() -> String {
    "https://api.paystack.co".to_string()
}

fn default_payment_timeout() -> u64 {
    10
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            provider: PaymentProvider::default(),
            base_url: default_base_url(),
            secret_key: None,
            timeout_secs: default_payment_timeout(),
            confirmation: PaymentConfirmation::default(),
        }
    }
}

impl PaymentSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Sweeper Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperSettings {
    /// Seconds between expiry sweeps. Default: one day.
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
}

fn default_sweep_interval() -> u64 {
    86_400
}

impl Default for SweeperSettings {
    fn default() -> Self {
        SweeperSettings {
            interval_secs: default_sweep_interval(),
        }
    }
}

impl SweeperSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoxOfficeConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub payment: PaymentSettings,

    #[serde(default)]
    pub sweeper: SweeperSettings,
}

impl BoxOfficeConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (boxoffice.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let config = Self::read(config_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Same sources as [`load`](Self::load) without validation. Hosts that
    /// never take payments (the expiry sweeper) check only
    /// [`validate_storage`](Self::validate_storage).
    pub fn read(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parses a TOML document. Missing sections take their defaults.
    pub fn from_toml_str(contents: &str) -> EngineResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates every section.
    pub fn validate(&self) -> EngineResult<()> {
        self.validate_storage()?;
        self.validate_payment()
    }

    /// Database and sweeper sections only.
    pub fn validate_storage(&self) -> EngineResult<()> {
        if self.database.max_connections == 0 {
            return Err(EngineError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.sweeper.interval_secs == 0 {
            return Err(EngineError::Config(
                "sweeper.interval_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn validate_payment(&self) -> EngineResult<()> {
        if self.payment.timeout_secs == 0 {
            return Err(EngineError::Config(
                "payment.timeout_secs must be greater than 0".into(),
            ));
        }

        let url = Url::parse(&self.payment.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(EngineError::Config(format!(
                "payment.base_url must start with http:// or https://, got: {}",
                self.payment.base_url
            )));
        }

        if self.payment.provider == PaymentProvider::Paystack {
            let missing = self
                .payment
                .secret_key
                .as_deref()
                .map(|k| k.trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(EngineError::Config(
                    "payment.secret_key (or PAYSTACK_SECRET_KEY) is required for paystack".into(),
                ));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides read through `var`.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("BOXOFFICE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(provider) = var("BOXOFFICE_PAYMENT_PROVIDER") {
            match provider.parse() {
                Ok(parsed) => self.payment.provider = parsed,
                Err(_) => warn!(provider = %provider, "Unknown payment provider in environment"),
            }
        }

        if let Some(key) = var("PAYSTACK_SECRET_KEY") {
            self.payment.secret_key = Some(key);
        }

        if let Some(url) = var("BOXOFFICE_PAYMENT_BASE_URL") {
            debug!(url = %url, "Overriding payment base URL from environment");
            self.payment.base_url = url;
        }

        if let Some(secs) = var("BOXOFFICE_PAYMENT_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.payment.timeout_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring non-numeric BOXOFFICE_PAYMENT_TIMEOUT_SECS"),
            }
        }

        if let Some(secs) = var("BOXOFFICE_SWEEP_INTERVAL_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.sweeper.interval_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring non-numeric BOXOFFICE_SWEEP_INTERVAL_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("io", "boxoffice", "boxoffice")
            .map(|dirs| dirs.config_dir().join("boxoffice.toml"))
    }
}
