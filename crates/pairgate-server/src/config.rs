// ============================================
// File: crates/pairgate-server/src/config.rs
// ============================================
//! # Server Configuration
//!
//! ## Creation Reason
//! Provides configuration management for the pairing server, loaded
//! from a TOML file with defaults for every section.
//!
//! ## Main Functionality
//! - `ServerConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//! - Conversion of configured scans into `ScanRecord`s
//!
//! ## Configuration Sections
//! - `network`: TCP listen address
//! - `limits`: Queue capacity, response write timeout and retries
//! - `logging`: Log level
//! - `console`: Whether stdin is read as an operator console
//! - `scans`: Scans registered at startup
//!
//! ## Example Configuration
//! ```toml
//! [network]
//! listen_addr = "0.0.0.0:1200"
//!
//! [limits]
//! channel_capacity = 1000
//! write_timeout_ms = 500
//! write_retries = 3
//!
//! [logging]
//! level = "info"
//!
//! [console]
//! enabled = true
//!
//! [[scans]]
//! static_public_key = "50d2813e7611fe0177421385e193de017f2259a25c278645e3ed74f723808370"
//! preshared_key = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - All config changes require server restart
//! - Pre-shared keys live in this file in clear text, protect it
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use pairgate_common::parse_key_hex;
use pairgate_core::crypto::PresharedKey;
use pairgate_transport::WritePolicy;

use crate::error::{Result, ServerError};
use crate::services::ScanRecord;

// ============================================
// ServerConfig
// ============================================

/// Main server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Queue and write limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Operator console.
    #[serde(default)]
    pub console: ConsoleConfig,

    /// Scans registered at startup.
    #[serde(default)]
    pub scans: Vec<ScanConfig>,
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.limits.validate()?;
        for (index, scan) in self.scans.iter().enumerate() {
            scan.to_record(index)?;
        }
        Ok(())
    }

    /// Returns the listen address.
    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        self.network.listen_addr
    }

    /// Returns the write policy for gateway response sinks.
    #[must_use]
    pub fn write_policy(&self) -> WritePolicy {
        WritePolicy {
            timeout: Duration::from_millis(self.limits.write_timeout_ms),
            retries: self.limits.write_retries,
        }
    }

    /// Converts the configured scans into records.
    pub fn scan_records(&self) -> Result<Vec<ScanRecord>> {
        self.scans
            .iter()
            .enumerate()
            .map(|(index, scan)| scan.to_record(index))
            .collect()
    }
}

impl FromStr for ServerConfig {
    type Err = ServerError;

    /// Parses and validates configuration from a TOML string.
    fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ServerError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================
// NetworkConfig
// ============================================

/// Network configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// TCP listen address. Port 0 binds an ephemeral port.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 1200))
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

// ============================================
// LimitsConfig
// ============================================

/// Queue and write limits section.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Capacity of each orchestrator input queue.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Per-attempt wait for a writable gateway socket, in milliseconds.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Stalled write attempts tolerated before a response is dropped.
    #[serde(default = "default_write_retries")]
    pub write_retries: u32,
}

fn default_channel_capacity() -> usize {
    1000
}

fn default_write_timeout_ms() -> u64 {
    500
}

fn default_write_retries() -> u32 {
    3
}

impl LimitsConfig {
    fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(ServerError::config_invalid(
                "limits.channel_capacity",
                "must be greater than 0",
            ));
        }

        if self.write_timeout_ms == 0 {
            return Err(ServerError::config_invalid(
                "limits.write_timeout_ms",
                "must be greater than 0",
            ));
        }

        if self.write_retries == 0 {
            return Err(ServerError::config_invalid(
                "limits.write_retries",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            write_timeout_ms: default_write_timeout_ms(),
            write_retries: default_write_retries(),
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// ConsoleConfig
// ============================================

/// Operator console section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    /// Read console commands from stdin.
    #[serde(default = "default_console_enabled")]
    pub enabled: bool,
}

fn default_console_enabled() -> bool {
    true
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: default_console_enabled(),
        }
    }
}

// ============================================
// ScanConfig
// ============================================

/// One pre-registered scan, keys as 64 hex digits.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Gateway static public key.
    pub static_public_key: String,
    /// Pre-shared key.
    pub preshared_key: String,
}

impl ScanConfig {
    fn to_record(&self, index: usize) -> Result<ScanRecord> {
        let invalid = |field: &str, e: pairgate_common::CommonError| {
            ServerError::config_invalid(format!("scans[{index}].{field}"), e.to_string())
        };

        let static_public_key = parse_key_hex("static_public_key", &self.static_public_key)
            .map_err(|e| invalid("static_public_key", e))?;
        let preshared_key = parse_key_hex("preshared_key", &self.preshared_key)
            .map_err(|e| invalid("preshared_key", e))?;

        Ok(ScanRecord::new(
            static_public_key,
            PresharedKey::from_bytes(preshared_key),
        ))
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "50d2813e7611fe0177421385e193de017f2259a25c278645e3ed74f723808370";
    const PSK: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr().port(), 1200);
        assert_eq!(config.limits.channel_capacity, 1000);
        assert!(config.console.enabled);
        assert!(config.scans.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = format!(
            r#"
[network]
listen_addr = "127.0.0.1:0"

[limits]
channel_capacity = 16
write_timeout_ms = 50
write_retries = 2

[logging]
level = "debug"

[console]
enabled = false

[[scans]]
static_public_key = "{KEY}"
preshared_key = "{PSK}"
"#
        );

        let config: ServerConfig = toml.parse().unwrap();
        assert_eq!(config.listen_addr().port(), 0);
        assert_eq!(config.logging.level, "debug");
        assert!(!config.console.enabled);

        let policy = config.write_policy();
        assert_eq!(policy.timeout, Duration::from_millis(50));
        assert_eq!(policy.retries, 2);

        let scans = config.scan_records().unwrap();
        assert_eq!(scans.len(), 1);
        assert_eq!(scans[0].static_public_key[31], 0x70);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ServerConfig = "[logging]\nlevel = \"warn\"\n".parse().unwrap();
        assert_eq!(config.listen_addr().port(), 1200);
        assert_eq!(config.limits.write_retries, 3);
    }

    #[test]
    fn test_invalid_limits() {
        let result = "[limits]\nchannel_capacity = 0\n".parse::<ServerConfig>();
        assert!(matches!(result, Err(ServerError::ConfigInvalid { .. })));

        let result = "[limits]\nwrite_retries = 0\n".parse::<ServerConfig>();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_scan_key() {
        let toml = format!(
            "[[scans]]\nstatic_public_key = \"{}\"\npreshared_key = \"{PSK}\"\n",
            &KEY[..63]
        );
        let err = toml.parse::<ServerConfig>().unwrap_err();
        assert!(matches!(err, ServerError::ConfigInvalid { .. }));
        assert!(err.to_string().contains("scans[0].static_public_key"));
    }
}
