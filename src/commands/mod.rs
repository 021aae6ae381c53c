pub mod aggregate;
pub mod listen;
pub mod relay;

use anyhow::{Context, Result};
use std::path::Path;

use mink::config::Config;
use mink::error::MinkErrorTrait;

// Re-export command functions for convenience
pub use aggregate::{aggregate, collect, AggregateParams, CollectParams};
pub use listen::{listen, ListenParams};
pub use relay::{relay_server, RelayParams};

/// Load configuration from `path`, or from the environment when absent
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::from_env().context("Failed to read configuration from environment"),
    }
}

/// Resolves on Ctrl+C
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!("Failed to wait for Ctrl+C: {}", e),
    }
}

/// Log a library error with its category, then wrap it for the caller
pub fn report_error(err: mink::error::Error, action: &str) -> anyhow::Error {
    tracing::error!(
        category = err.category().as_str(),
        recoverable = err.is_recoverable(),
        error = %err,
        "{} failed",
        action
    );
    anyhow::Error::new(err).context(format!("{action} failed"))
}
