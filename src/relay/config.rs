//! Relay server configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Default relay port
pub const DEFAULT_RELAY_PORT: u16 = 8081;

/// Largest accepted WebSocket message (full memento lists can be several MB)
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for the broadcast relay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Enable CORS (the browser UI is served from another origin)
    pub enable_cors: bool,

    /// Enable request logging
    pub enable_request_logging: bool,

    /// Maximum size of one inbound message in bytes
    pub max_message_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], DEFAULT_RELAY_PORT)),
            enable_cors: true,
            enable_request_logging: true,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl RelayConfig {
    /// Create a new config builder
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_message_bytes".to_string(),
                reason: "Must allow at least 1 byte".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for RelayConfig
#[derive(Debug, Default)]
pub struct RelayConfigBuilder {
    bind_address: Option<SocketAddr>,
    enable_cors: Option<bool>,
    enable_request_logging: Option<bool>,
    max_message_bytes: Option<usize>,
}

impl RelayConfigBuilder {
    /// Set bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = Some(addr);
        self
    }

    /// Set bind address from string
    pub fn bind_address_str(mut self, addr: &str) -> Result<Self, ConfigError> {
        self.bind_address = Some(addr.parse().map_err(|_| ConfigError::InvalidValue {
            field: "bind_address".to_string(),
            reason: format!("Invalid address: {addr}"),
        })?);
        Ok(self)
    }

    /// Enable/disable CORS
    pub fn enable_cors(mut self, enable: bool) -> Self {
        self.enable_cors = Some(enable);
        self
    }

    /// Enable/disable request logging
    pub fn enable_request_logging(mut self, enable: bool) -> Self {
        self.enable_request_logging = Some(enable);
        self
    }

    /// Set the inbound message size limit
    pub fn max_message_bytes(mut self, bytes: usize) -> Self {
        self.max_message_bytes = Some(bytes);
        self
    }

    /// Build the config
    pub fn build(self) -> Result<RelayConfig, ConfigError> {
        let defaults = RelayConfig::default();
        let config = RelayConfig {
            bind_address: self.bind_address.unwrap_or(defaults.bind_address),
            enable_cors: self.enable_cors.unwrap_or(defaults.enable_cors),
            enable_request_logging: self
                .enable_request_logging
                .unwrap_or(defaults.enable_request_logging),
            max_message_bytes: self.max_message_bytes.unwrap_or(defaults.max_message_bytes),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{field}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address.port(), 8081);
        assert!(config.enable_cors);
    }

    #[test]
    fn test_config_builder() {
        let config = RelayConfig::builder()
            .enable_cors(false)
            .enable_request_logging(false)
            .max_message_bytes(1024)
            .build()
            .unwrap();

        assert!(!config.enable_cors);
        assert!(!config.enable_request_logging);
        assert_eq!(config.max_message_bytes, 1024);
    }

    #[test]
    fn test_config_validation_fails() {
        let result = RelayConfig::builder().max_message_bytes(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_builder_with_address() {
        let config = RelayConfig::builder()
            .bind_address_str("127.0.0.1:9000")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.bind_address.port(), 9000);
        assert!(RelayConfig::builder().bind_address_str("nope").is_err());
    }
}
