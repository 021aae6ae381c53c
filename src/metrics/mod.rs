//! Prometheus metrics for the mink aggregator and relay
//!
//! This module provides metrics tracking for:
//! - Aggregator: fetch outcomes per source, mementos collected, fallback stage results
//! - Relay: open connections, messages received, deliveries fanned out
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, register_int_counter,
    register_int_counter_vec, CounterVec, Encoder, Gauge, HistogramVec, IntCounter,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all aggregator metrics
struct AggregatorMetrics {
    fetches: IntCounterVec,
    fetch_duration: HistogramVec,
    mementos: CounterVec,
    stage_runs: IntCounterVec,
}

/// Container for all relay metrics
struct RelayMetrics {
    open_connections: Gauge,
    connections_total: IntCounter,
    messages_received: IntCounter,
    deliveries: IntCounterVec,
}

/// Global storage for aggregator metrics
static AGGREGATOR_METRICS: OnceLock<AggregatorMetrics> = OnceLock::new();

/// Global storage for relay metrics
static RELAY_METRICS: OnceLock<RelayMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, subsequent metric operations become no-ops.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let aggregator = AggregatorMetrics {
        fetches: register_int_counter_vec!(
            "mink_fetches_total",
            "Total provider fetches by source and outcome",
            &["source", "outcome"]
        )?,
        fetch_duration: register_histogram_vec!(
            "mink_fetch_duration_seconds",
            "Provider fetch duration in seconds",
            &["source"],
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        )?,
        mementos: register_counter_vec!(
            "mink_mementos_total",
            "Total mementos collected by source",
            &["source"]
        )?,
        stage_runs: register_int_counter_vec!(
            "mink_fallback_stage_runs_total",
            "Fallback stage executions by stage and outcome",
            &["stage", "outcome"]
        )?,
    };

    let relay = RelayMetrics {
        open_connections: register_gauge!(
            "mink_relay_open_connections",
            "Number of currently open relay connections"
        )?,
        connections_total: register_int_counter!(
            "mink_relay_connections_total",
            "Total relay connections accepted"
        )?,
        messages_received: register_int_counter!(
            "mink_relay_messages_received_total",
            "Total messages received for broadcast"
        )?,
        deliveries: register_int_counter_vec!(
            "mink_relay_deliveries_total",
            "Fan-out deliveries by result",
            &["result"]
        )?,
    };

    AGGREGATOR_METRICS
        .set(aggregator)
        .map_err(|_| "Aggregator metrics already initialized")?;
    RELAY_METRICS
        .set(relay)
        .map_err(|_| "Relay metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    AGGREGATOR_METRICS.get().is_some() && RELAY_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record one provider fetch
pub fn record_fetch(source: &str, outcome: &str, duration_secs: f64) {
    let Some(m) = AGGREGATOR_METRICS.get() else {
        return;
    };

    m.fetches.with_label_values(&[source, outcome]).inc();
    m.fetch_duration
        .with_label_values(&[source])
        .observe(duration_secs);
}

/// Record mementos collected from a source
pub fn record_mementos(source: &str, count: usize) {
    if count == 0 {
        return;
    }
    if let Some(m) = AGGREGATOR_METRICS.get() {
        m.mementos
            .with_label_values(&[source])
            .inc_by(count as f64);
    }
}

/// Record a fallback stage execution
pub fn record_stage(stage: &str, found: usize) {
    if let Some(m) = AGGREGATOR_METRICS.get() {
        let outcome = if found > 0 { "resolved" } else { "empty" };
        m.stage_runs.with_label_values(&[stage, outcome]).inc();
    }
}

/// Update the open relay connection gauge
pub fn update_relay_connections(open: usize) {
    if let Some(m) = RELAY_METRICS.get() {
        m.open_connections.set(open as f64);
    }
}

/// Record an accepted relay connection
pub fn record_relay_connection() {
    if let Some(m) = RELAY_METRICS.get() {
        m.connections_total.inc();
    }
}

/// Record one broadcast and its fan-out results
pub fn record_broadcast(delivered: usize, dropped: usize) {
    let Some(m) = RELAY_METRICS.get() else {
        return;
    };

    m.messages_received.inc();
    if delivered > 0 {
        m.deliveries
            .with_label_values(&["delivered"])
            .inc_by(delivered as u64);
    }
    if dropped > 0 {
        m.deliveries
            .with_label_values(&["dropped"])
            .inc_by(dropped as u64);
    }
}

// ============================================================================
// Tests
// ============================================================================
