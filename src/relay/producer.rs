//! Producer and listener runs
//!
//! The producer connects to the relay, aggregates mementos for one target
//! and publishes the result as a single JSON array. Failing to reach the
//! relay ends the run; nothing is retried.

use std::future::Future;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::Config;
use crate::crawler::Aggregator;
use crate::error::{Error, Result};
use crate::filter::ListenSession;
use crate::models::FallbackStage;
use crate::storage::{JsonFileSink, RecordSink};

use super::client::{decode_records, RelayClient};

/// Outcome of one producer run
#[derive(Debug, Clone)]
pub struct ProducerReport {
    /// Target that was aggregated
    pub target_url: String,

    /// Records found
    pub mementos: usize,

    /// Stage that produced the records
    pub resolved_by: Option<FallbackStage>,

    /// Whether a message was sent to the relay
    pub published: bool,

    /// Size of the published payload
    pub payload_bytes: usize,

    /// File the records were written to
    pub output_path: Option<PathBuf>,
}

/// Run one producer cycle
///
/// Connect, aggregate, publish. When `client.listen_after_publish` is set,
/// keep the connection and log incoming broadcasts until the relay closes
/// it or `shutdown` fires.
pub async fn run_producer(
    config: &Config,
    shutdown: impl Future<Output = ()> + Send,
) -> Result<ProducerReport> {
    let mut client = RelayClient::connect(&config.client.relay_url).await?;

    let aggregator =
        Aggregator::new(&config.aggregator).map_err(|e| Error::config(format!("{e:#}")))?;
    let result = aggregator.aggregate(&config.aggregator.target_url).await;

    let mut report = ProducerReport {
        target_url: result.target_url.clone(),
        mementos: result.len(),
        resolved_by: result.resolved_by,
        published: false,
        payload_bytes: 0,
        output_path: None,
    };

    // The optional file copy must not prevent publishing.
    if let Some(path) = &config.client.output_path {
        let sink = JsonFileSink::new(path);
        match sink.write(&result.records).await {
            Ok(()) => report.output_path = Some(path.clone()),
            Err(e) => warn!(sink = sink.name(), error = %e, "Failed to write results"),
        }
    }

    if result.is_empty() && !config.client.publish_empty {
        info!(target = %result.target_url, "Nothing found; not publishing");
    } else {
        report.payload_bytes = client.publish(&result.records).await?;
        report.published = true;
        info!(
            target = %result.target_url,
            mementos = result.len(),
            bytes = report.payload_bytes,
            "Published to relay"
        );
    }

    if config.client.listen_after_publish {
        let mut session = ListenSession::new();
        collect_broadcasts(&mut client, &mut session, shutdown).await?;
        info!(
            messages = session.message_count(),
            mementos = session.len(),
            "Stopped listening"
        );
    }

    client.close().await?;
    Ok(report)
}

/// Receive broadcasts into `session` until the relay closes or `shutdown` fires
///
/// Payloads that are not memento records are logged and skipped.
pub async fn collect_broadcasts(
    client: &mut RelayClient,
    session: &mut ListenSession,
    shutdown: impl Future<Output = ()> + Send,
) -> Result<()> {
    tokio::pin!(shutdown);

    loop {
        let payload = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                return Ok(());
            }
            received = client.recv_text() => received?,
        };

        let Some(payload) = payload else {
            info!(relay = %client.url(), "Relay closed the connection");
            return Ok(());
        };

        match decode_records(&payload) {
            Ok(records) => {
                info!(mementos = records.len(), "Received broadcast");
                session.extend(records);
            }
            Err(e) => warn!(error = %e, bytes = payload.len(), "Ignoring non-memento message"),
        }
    }
}
