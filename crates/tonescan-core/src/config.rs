//! Configuration management for Tonescan.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. All per-operation timeouts (connect,
//! per-response read, overall dial ceiling, status polling) live here so
//! that no backend hardcodes them.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main application configuration.
///
/// This is loaded from `~/.config/tonescan/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Dial session settings
    pub session: SessionConfig,
    /// Modem backend settings
    pub modem: ModemConfig,
    /// Cloud voice backend settings
    pub cloud: CloudConfig,
    /// Result storage settings
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `TONESCAN_MODEM_PORT`: Override the modem serial port path
    /// - `TONESCAN_DIAL_TIMEOUT_SECS`: Override the per-dial ceiling
    /// - `TONESCAN_RANDOMIZE`: Override randomized dialing (true/false)
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;

        // Override from environment
        if let Ok(val) = std::env::var("TONESCAN_MODEM_PORT") {
            if !val.is_empty() {
                tracing::debug!("Override modem.port from env: {}", val);
                config.modem.port = val;
            }
        }

        if let Ok(val) = std::env::var("TONESCAN_DIAL_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.modem.dial_timeout_secs = secs;
                tracing::debug!("Override modem.dial_timeout_secs from env: {}", secs);
            }
        }

        if let Ok(val) = std::env::var("TONESCAN_RANDOMIZE") {
            if let Ok(randomize) = val.parse() {
                config.session.randomize = randomize;
                tracing::debug!("Override session.randomize from env: {}", randomize);
            }
        }

        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/tonescan/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "tonescan", "tonescan").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/tonescan`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "tonescan", "tonescan").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Dial session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Dial candidates in random order instead of sequential
    pub randomize: bool,
    /// Seed for the shuffled order; random orders with the same seed are
    /// identical, which resumed sessions rely on
    pub shuffle_seed: Option<u64>,
    /// Delay between dial attempts in milliseconds
    pub delay_between_dials_ms: u64,
    /// Calling code used to select the country profile
    pub calling_code: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            randomize: false,
            shuffle_seed: None,
            delay_between_dials_ms: 500,
            calling_code: "1".to_string(),
        }
    }
}

/// Modem backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    /// Serial port path (e.g. `/dev/ttyUSB0`, `COM1`)
    pub port: String,
    /// Baud rate for the serial connection
    pub baud_rate: u32,
    /// Timeout for AT command acknowledgment in seconds
    pub command_timeout_secs: u64,
    /// Timeout for a single response line read in seconds
    pub response_timeout_secs: u64,
    /// Overall ceiling for one dial attempt in seconds
    pub dial_timeout_secs: u64,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 57_600,
            command_timeout_secs: 2,
            response_timeout_secs: 2,
            dial_timeout_secs: 30,
        }
    }
}

/// Cloud voice backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Base URL of the voice API
    pub base_url: String,
    /// Account identifier for the voice provider
    pub account_sid: String,
    /// Auth token (kept out of the config file; set via the vault or env)
    #[serde(skip)]
    pub auth_token: Option<String>,
    /// Caller number in E.164 format (e.g. `+15551234567`)
    pub from_number: String,
    /// Optional URL serving call instructions to the provider
    pub instructions_url: Option<String>,
    /// Interval between status polls in milliseconds
    pub poll_interval_ms: u64,
    /// Maximum number of status polls before a dial is timed out
    pub max_polls: u32,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twilio.com/2010-04-01".to_string(),
            account_sid: String::new(),
            auth_token: None,
            from_number: String::new(),
            instructions_url: None,
            poll_interval_ms: 500,
            max_polls: 60,
        }
    }
}

/// Result storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage kind: "csv", "sqlite" or "dry-run"
    pub kind: String,
    /// Path to the results file (CSV file or SQLite database)
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: "sqlite".to_string(),
            path: "tonescan_results.db".to_string(),
        }
    }
}
