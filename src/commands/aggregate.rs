use anyhow::{Context, Result};
use std::path::PathBuf;

use mink::config::Config;
use mink::crawler::Aggregator;
use mink::relay::run_producer;
use mink::storage::{JsonFileSink, RecordSink, StdoutSink};

use super::{report_error, shutdown_signal};

// ============================================================================
// Producer
// ============================================================================

/// Parameters for the aggregate command
pub struct AggregateParams {
    pub url: Option<String>,
    pub relay: Option<String>,
    pub output: Option<PathBuf>,
    pub listen: bool,
}

/// Aggregate one target and publish the result to the relay
pub async fn aggregate(mut config: Config, params: AggregateParams) -> Result<()> {
    if let Some(url) = params.url {
        config.aggregator.target_url = url;
    }
    if let Some(relay) = params.relay {
        config.client.relay_url = relay;
    }
    if params.output.is_some() {
        config.client.output_path = params.output;
    }
    if params.listen {
        config.client.listen_after_publish = true;
    }
    config.validate()?;

    let report = run_producer(&config, shutdown_signal())
        .await
        .map_err(|e| report_error(e, "Producer run"))?;

    println!("\nAggregation Complete");
    println!("====================");
    println!("Target: {}", report.target_url);
    println!("Mementos: {}", report.mementos);
    println!(
        "Resolved by: {}",
        report
            .resolved_by
            .map_or("none", |stage| stage.as_str())
    );
    if report.published {
        println!("Published: {} bytes to {}", report.payload_bytes, config.client.relay_url);
    } else {
        println!("Published: skipped (empty result)");
    }
    if let Some(path) = report.output_path {
        println!("Written to: {}", path.display());
    }

    Ok(())
}

// ============================================================================
// Collect (no relay)
// ============================================================================

/// Parameters for the collect command
pub struct CollectParams {
    pub url: Option<String>,
    pub output: Option<PathBuf>,
}

/// Aggregate one target and print or write the records
pub async fn collect(mut config: Config, params: CollectParams) -> Result<()> {
    if let Some(url) = params.url {
        config.aggregator.target_url = url;
    }
    config.aggregator.validate()?;

    let aggregator = Aggregator::new(&config.aggregator)?;
    let result = aggregator.aggregate(&config.aggregator.target_url).await;

    let sink: Box<dyn RecordSink> = match params.output {
        Some(path) => Box::new(JsonFileSink::new(path)),
        None => Box::new(StdoutSink),
    };
    sink.write(&result.records)
        .await
        .with_context(|| format!("Failed to write results to {}", sink.name()))?;

    let tried: Vec<&str> = result.stages_tried.iter().map(|s| s.as_str()).collect();
    eprintln!(
        "{} mementos for {} (stages tried: {})",
        result.len(),
        result.target_url,
        tried.join(" -> ")
    );
    for (source, count) in result.counts_by_source() {
        eprintln!("  {source}: {count}");
    }

    Ok(())
}
