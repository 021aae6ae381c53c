//! mink - Memento aggregator and broadcast relay
//!
//! Collects archived snapshots ("mementos") of a URL from web archives and
//! hands them to a WebSocket relay that fans them out to every other
//! connected client.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Rate-limited archive fetching and the fallback chain
//! - [`parser`] - CDX, TimeMap JSON and link-format interpretation
//! - [`models`] - Core data structures and types
//! - [`relay`] - WebSocket broadcast relay, client and producer
//! - [`filter`] - Source and date filtering of received mementos
//! - [`storage`] - Result sinks
//! - [`metrics`] - Prometheus metrics
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use mink::config::Config;
//! use mink::crawler::Aggregator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let aggregator = Aggregator::new(&config.aggregator)?;
//!     let result = aggregator.aggregate("https://cnn.com").await;
//!     println!("{}", result.to_payload()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod models;
pub mod parser;
pub mod relay;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::Aggregator;
    pub use crate::error::{Error, ErrorCategory, MinkErrorTrait, Result};
    pub use crate::filter::{ListenSession, MementoFilter};
    pub use crate::models::{AggregationResult, FallbackStage, MementoRecord};
    pub use crate::relay::{RelayClient, RelayServer};
    pub use crate::storage::{JsonFileSink, RecordSink};
}

// Direct re-exports for convenience
pub use models::{AggregationResult, FallbackStage, MementoRecord, ProviderEntry};
