//! Configuration management for mink
//!
//! This module handles loading and validating configuration from environment variables,
//! files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::relay::RelayConfig;

/// Default target when none is given
pub const DEFAULT_TARGET_URL: &str = "https://cnn.com";

/// Default User-Agent sent to archives
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; MinkAggregator/1.0)";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Aggregation configuration
    pub aggregator: AggregatorConfig,

    /// Relay server configuration
    pub relay: RelayConfig,

    /// Relay client configuration
    pub client: ClientSection,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Aggregation-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Original URL to collect mementos for
    pub target_url: String,

    /// Base URL of the Wayback-style archive (CDX, timemap json/link)
    pub archive_base_url: String,

    /// Label used as `source` for records from the archive itself
    pub provider_label: String,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Rate limit (requests per second)
    pub rate_limit: u32,

    /// Maximum CDX rows requested
    pub cdx_limit: u32,

    /// How deep nested TimeMap indexes are followed (at least 1)
    pub max_index_depth: u32,

    /// User agent string
    pub user_agent: String,
}

/// Relay client section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// WebSocket URL of the relay
    pub relay_url: String,

    /// Publish `[]` when aggregation finds nothing
    pub publish_empty: bool,

    /// Keep the connection open after publishing and log broadcasts
    pub listen_after_publish: bool,

    /// Optional file the result set is also written to
    pub output_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let target_url =
            std::env::var("MINK_TARGET_URL").unwrap_or(defaults.aggregator.target_url);

        let archive_base_url = std::env::var("MINK_ARCHIVE_BASE_URL")
            .unwrap_or(defaults.aggregator.archive_base_url);

        let provider_label =
            std::env::var("MINK_PROVIDER_LABEL").unwrap_or(defaults.aggregator.provider_label);

        let timeout_ms = std::env::var("MINK_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.aggregator.timeout_ms);

        let rate_limit = std::env::var("MINK_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.aggregator.rate_limit);

        let cdx_limit = std::env::var("MINK_CDX_LIMIT")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.aggregator.cdx_limit);

        let bind_address = match std::env::var("MINK_RELAY_BIND") {
            Ok(v) => v
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid MINK_RELAY_BIND: {v}"))?,
            Err(_) => defaults.relay.bind_address,
        };

        let relay_url = std::env::var("MINK_RELAY_URL").unwrap_or(defaults.client.relay_url);

        let publish_empty = std::env::var("MINK_PUBLISH_EMPTY")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(defaults.client.publish_empty);

        let output_path = std::env::var("MINK_OUTPUT_PATH").ok().map(PathBuf::from);

        let log_level = std::env::var("MINK_LOG_LEVEL").unwrap_or(defaults.logging.level);

        let log_format = std::env::var("MINK_LOG_FORMAT").unwrap_or(defaults.logging.format);

        Ok(Self {
            aggregator: AggregatorConfig {
                target_url,
                archive_base_url,
                provider_label,
                timeout_ms,
                rate_limit,
                cdx_limit,
                ..defaults.aggregator
            },
            relay: RelayConfig {
                bind_address,
                ..defaults.relay
            },
            client: ClientSection {
                relay_url,
                publish_empty,
                output_path,
                ..defaults.client
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.aggregator.validate()?;
        self.relay.validate()?;

        if self.client.relay_url.trim().is_empty() {
            anyhow::bail!("relay_url must not be empty");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.aggregator.request_timeout()
    }
}

impl AggregatorConfig {
    /// Validate aggregation settings
    pub fn validate(&self) -> Result<()> {
        if self.target_url.trim().is_empty() {
            anyhow::bail!("target_url must not be empty");
        }

        if self.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than 0");
        }

        if self.rate_limit == 0 {
            anyhow::bail!("rate_limit must be positive");
        }

        if self.cdx_limit == 0 {
            anyhow::bail!("cdx_limit must be greater than 0");
        }

        // Depth 0 would skip the top-level index and disable the index stage
        if self.max_index_depth == 0 {
            anyhow::bail!("max_index_depth must be at least 1");
        }

        let base = Url::parse(&self.archive_base_url)
            .with_context(|| format!("Invalid archive_base_url: {}", self.archive_base_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            anyhow::bail!("archive_base_url must be an http(s) URL");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            target_url: String::from(DEFAULT_TARGET_URL),
            archive_base_url: String::from("http://web.archive.org"),
            provider_label: String::from("web.archive.org"),
            timeout_ms: 10_000,
            rate_limit: 5,
            cdx_limit: 50,
            max_index_depth: 2,
            user_agent: String::from(DEFAULT_USER_AGENT),
        }
    }
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            relay_url: String::from("ws://localhost:8081"),
            publish_empty: true,
            listen_after_publish: false,
            output_path: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aggregator: AggregatorConfig::default(),
            relay: RelayConfig::default(),
            client: ClientSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}
