use anyhow::{Context, Result};
use std::path::PathBuf;

use mink::config::Config;
use mink::filter::{parse_date_bound, ListenSession, MementoFilter};
use mink::relay::{collect_broadcasts, RelayClient};
use mink::storage::{JsonFileSink, RecordSink};

use super::{report_error, shutdown_signal};

/// Parameters for the listen command
pub struct ListenParams {
    pub relay: Option<String>,
    pub source: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub output: Option<PathBuf>,
}

/// Listen for broadcasts until the relay closes or Ctrl+C, then show a filtered view
pub async fn listen(config: Config, params: ListenParams) -> Result<()> {
    let relay_url = params.relay.unwrap_or(config.client.relay_url);

    let mut filter = MementoFilter::new();
    if let Some(source) = params.source {
        filter = filter.with_source(source);
    }
    if let Some(raw) = params.from.as_deref() {
        let from = parse_date_bound(raw, false)
            .with_context(|| format!("Invalid --from date: {raw}"))?;
        filter = filter.with_from(from);
    }
    if let Some(raw) = params.to.as_deref() {
        let to = parse_date_bound(raw, true).with_context(|| format!("Invalid --to date: {raw}"))?;
        filter = filter.with_to(to);
    }

    let mut client = RelayClient::connect(&relay_url)
        .await
        .map_err(|e| report_error(e.into(), "Connecting to relay"))?;
    println!("Listening on {relay_url}. Press Ctrl+C to stop.\n");

    let mut session = ListenSession::new();
    collect_broadcasts(&mut client, &mut session, shutdown_signal())
        .await
        .map_err(|e| report_error(e, "Listening"))?;

    let view = session.view(&filter);
    println!("\nReceived {} messages, {} mementos", session.message_count(), session.len());
    println!("Sources: {}", session.sources().join(", "));
    println!("Matching filter: {}\n", view.len());
    for record in &view {
        println!("  {record}");
    }

    if let Some(path) = params.output {
        let records: Vec<_> = view.into_iter().cloned().collect();
        JsonFileSink::new(path).write(&records).await?;
    }

    Ok(())
}
