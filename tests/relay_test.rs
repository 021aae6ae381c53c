//! Integration tests for the broadcast relay and producer
//!
//! Each test runs an in-process relay on an ephemeral port and talks to it
//! over real WebSocket connections.

mod common;

use std::future::pending;
use std::time::Duration;

use common::TestRelay;
use futures::{SinkExt, StreamExt};
use mink::config::Config;
use mink::error::{Error, ErrorCategory, MinkErrorTrait, RelayError};
use mink::models::MementoRecord;
use mink::relay::{decode_records, run_producer, RelayClient};
use tempfile::TempDir;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);
const SILENCE: Duration = Duration::from_millis(200);

async fn recv(client: &mut RelayClient) -> String {
    timeout(RECV_TIMEOUT, client.recv_text())
        .await
        .expect("no message received")
        .unwrap()
        .expect("connection closed")
}

/// Client 1's message reaches clients 2 and 3 once each, never client 1
#[tokio::test]
async fn test_fan_out_excludes_sender() {
    let relay = TestRelay::start().await;

    let mut c1 = RelayClient::connect(&relay.url()).await.unwrap();
    let mut c2 = RelayClient::connect(&relay.url()).await.unwrap();
    let mut c3 = RelayClient::connect(&relay.url()).await.unwrap();
    relay.wait_for_connections(3).await;

    let records = common::sample_records();
    c1.publish(&records).await.unwrap();

    assert_eq!(decode_records(&recv(&mut c2).await).unwrap(), records);
    assert_eq!(decode_records(&recv(&mut c3).await).unwrap(), records);

    assert!(timeout(SILENCE, c1.recv_text()).await.is_err());
    assert!(timeout(SILENCE, c2.recv_text()).await.is_err());
    assert!(timeout(SILENCE, c3.recv_text()).await.is_err());
}

/// Payloads are forwarded verbatim, whatever they contain
#[tokio::test]
async fn test_payload_forwarded_unmodified() {
    let relay = TestRelay::start().await;

    let mut sender = RelayClient::connect(&relay.url()).await.unwrap();
    let mut receiver = RelayClient::connect(&relay.url()).await.unwrap();
    relay.wait_for_connections(2).await;

    let payload = r#"  {"not": "a memento list"}  "#;
    sender.send_text(payload).await.unwrap();

    assert_eq!(recv(&mut receiver).await, payload);
}

/// Binary frames stay binary
#[tokio::test]
async fn test_binary_frame_type_preserved() {
    let relay = TestRelay::start().await;

    let (mut sender, _) = connect_async(relay.url()).await.unwrap();
    let (mut receiver, _) = connect_async(relay.url()).await.unwrap();
    relay.wait_for_connections(2).await;

    sender
        .send(Message::binary(vec![0u8, 159, 146, 150]))
        .await
        .unwrap();

    let message = timeout(RECV_TIMEOUT, receiver.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    match message {
        Message::Binary(bytes) => assert_eq!(&bytes[..], &[0u8, 159, 146, 150][..]),
        other => panic!("expected binary frame, got {other:?}"),
    }
}

/// A closed client is dropped from the set without disturbing the others
#[tokio::test]
async fn test_disconnect_is_pruned() {
    let relay = TestRelay::start().await;

    let mut c1 = RelayClient::connect(&relay.url()).await.unwrap();
    let c2 = RelayClient::connect(&relay.url()).await.unwrap();
    let mut c3 = RelayClient::connect(&relay.url()).await.unwrap();
    relay.wait_for_connections(3).await;

    c2.close().await.unwrap();
    relay.wait_for_connections(2).await;

    c1.send_text("[]").await.unwrap();
    assert_eq!(recv(&mut c3).await, "[]");
}

/// Messages from one sender arrive in the order they were sent
#[tokio::test]
async fn test_per_sender_order() {
    let relay = TestRelay::start().await;

    let mut sender = RelayClient::connect(&relay.url()).await.unwrap();
    let mut receiver = RelayClient::connect(&relay.url()).await.unwrap();
    relay.wait_for_connections(2).await;

    for i in 0..10 {
        sender.send_text(i.to_string()).await.unwrap();
    }
    for i in 0..10 {
        assert_eq!(recv(&mut receiver).await, i.to_string());
    }
}

// ============================================================================
// Producer
// ============================================================================

fn producer_config(relay: &TestRelay, archive: &MockServer) -> Config {
    let mut config = Config::default();
    config.aggregator = common::aggregator_config(&archive.uri());
    config.client.relay_url = relay.url();
    config
}

async fn empty_archive() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    server
}

/// Nothing found: the producer still publishes an empty array
#[tokio::test]
async fn test_producer_publishes_empty_array() {
    let relay = TestRelay::start().await;
    let archive = empty_archive().await;

    let mut listener = RelayClient::connect(&relay.url()).await.unwrap();
    relay.wait_for_connections(1).await;

    let report = run_producer(&producer_config(&relay, &archive), pending())
        .await
        .unwrap();

    assert_eq!(report.mementos, 0);
    assert!(report.published);
    assert_eq!(report.resolved_by, None);
    assert_eq!(recv(&mut listener).await, "[]");
}

/// With publish_empty off, an empty result sends nothing
#[tokio::test]
async fn test_producer_skips_empty_when_configured() {
    let relay = TestRelay::start().await;
    let archive = empty_archive().await;

    let mut listener = RelayClient::connect(&relay.url()).await.unwrap();
    relay.wait_for_connections(1).await;

    let mut config = producer_config(&relay, &archive);
    config.client.publish_empty = false;

    let report = run_producer(&config, pending()).await.unwrap();

    assert!(!report.published);
    assert!(timeout(SILENCE, listener.recv_text()).await.is_err());
}

/// Found records are published and written to the output file
#[tokio::test]
async fn test_producer_publishes_records_and_writes_file() {
    let relay = TestRelay::start().await;
    let archive = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(common::link_format_body(2)))
        .mount(&archive)
        .await;

    let mut listener = RelayClient::connect(&relay.url()).await.unwrap();
    relay.wait_for_connections(1).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("results.json");
    let mut config = producer_config(&relay, &archive);
    config.client.output_path = Some(output.clone());

    let report = run_producer(&config, pending()).await.unwrap();
    assert_eq!(report.mementos, 2);
    assert_eq!(report.output_path.as_deref(), Some(output.as_path()));

    let published = decode_records(&recv(&mut listener).await).unwrap();
    assert_eq!(published.len(), 2);

    let written: Vec<MementoRecord> =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written, published);
}

/// An unreachable relay ends the run before any aggregation happens
#[tokio::test]
async fn test_producer_fails_without_relay() {
    let archive = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&archive)
        .await;

    let mut config = Config::default();
    config.aggregator = common::aggregator_config(&archive.uri());
    config.client.relay_url = "ws://127.0.0.1:1".to_string();

    let result = run_producer(&config, pending()).await;

    let err = result.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Relay);
    assert!(matches!(err, Error::Relay(RelayError::Connect { .. })));
}

/// An aggregator configuration that cannot run is a config error, not a silent empty result
#[tokio::test]
async fn test_producer_rejects_invalid_aggregator_config() {
    let relay = TestRelay::start().await;
    let archive = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&archive)
        .await;

    let mut config = producer_config(&relay, &archive);
    config.aggregator.max_index_depth = 0;

    let err = run_producer(&config, pending()).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Config);
    assert!(matches!(err, Error::Config(ref msg) if msg.contains("max_index_depth")));
}
