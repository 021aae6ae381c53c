//! Result sinks
//!
//! A sink persists or displays one record set. The producer writes to a sink
//! after aggregation; the listener writes everything it accumulated when it
//! stops.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::MementoRecord;

/// Destination for a set of memento records
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Get the sink name
    fn name(&self) -> &str;

    /// Write the full record set, replacing whatever was written before
    async fn write(&self, records: &[MementoRecord]) -> Result<()>;
}

/// Writes records as a pretty-printed JSON array
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSink for JsonFileSink {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn write(&self, records: &[MementoRecord]) -> Result<()> {
        let body = serde_json::to_string_pretty(records)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(&self.path, body).await.map_err(|e| {
            Error::with_source(format!("Failed to write {}", self.path.display()), e)
        })?;

        info!(path = %self.path.display(), records = records.len(), "Results written");
        Ok(())
    }
}

/// Prints records to stdout, one JSON array
#[derive(Debug, Clone, Default)]
pub struct StdoutSink;

#[async_trait]
impl RecordSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn write(&self, records: &[MementoRecord]) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(records)?);
        Ok(())
    }
}
