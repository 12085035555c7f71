//! Configuration module
//!
//! The whole admission policy of the central system lives in one TOML file:
//! which chargers may boot, which tokens may authorize, and whether two
//! connections may share one serial number. The file is read once at startup
//! and never reloaded.

use std::fs;
use std::path::{Path, PathBuf};

use rust_ocpp::v2_0_1::enumerations::id_token_enum_type::IdTokenEnumType;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    /// Tokens that are allowed to authorize a charging session.
    #[serde(default)]
    pub accepted_tokens: Vec<TokenAllowEntry>,
    /// Chargers that are allowed to boot against this central system.
    #[serde(default)]
    pub accepted_chargers: Vec<ChargerAllowEntry>,
}

/// WebSocket server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::host")]
    pub host: String,
    #[serde(default = "defaults::port")]
    pub port: u16,
    /// Heartbeat interval (seconds) announced in the BootNotification response.
    #[serde(default = "defaults::heartbeat_interval")]
    pub heartbeat_interval: i32,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

/// Admission policy flags.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// When false, a second connection announcing an already-registered
    /// charge point identifier is torn down before any protocol exchange.
    #[serde(default = "defaults::allow_multiple_serial_numbers")]
    pub allow_multiple_serial_numbers: bool,
}

/// One entry of the token allow-list: exact (type, value) pair.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenAllowEntry {
    #[serde(rename = "type")]
    pub kind: IdTokenEnumType,
    pub value: String,
}

/// One entry of the charger allow-list.
///
/// `serial_number_regex` is matched anchored at the start of the serial
/// number; vendor and model must match exactly.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargerAllowEntry {
    pub vendor_name: String,
    pub model: String,
    pub serial_number_regex: String,
}

mod defaults {
    pub fn host() -> String {
        "[::]".to_string()
    }

    pub fn port() -> u16 {
        9000
    }

    pub fn heartbeat_interval() -> i32 {
        10
    }

    pub fn log_level() -> String {
        "info".to_string()
    }

    pub fn allow_multiple_serial_numbers() -> bool {
        true
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            heartbeat_interval: defaults::heartbeat_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allow_multiple_serial_numbers: defaults::allow_multiple_serial_numbers(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            security: SecurityConfig::default(),
            accepted_tokens: Vec::new(),
            accepted_chargers: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load the configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

/// Default config file location: `~/.config/ocpp-csms/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ocpp-csms")
        .join("config.toml")
}
