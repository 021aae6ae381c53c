//! Common test utilities

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use mink::config::AggregatorConfig;
use mink::models::MementoRecord;
use mink::relay::{RelayConfig, RelayHub, RelayServer};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Aggregator config pointed at a mock archive, with a short timeout
pub fn aggregator_config(archive_base: &str) -> AggregatorConfig {
    AggregatorConfig {
        target_url: "cnn.com".to_string(),
        archive_base_url: archive_base.to_string(),
        timeout_ms: 500,
        rate_limit: 1000,
        ..AggregatorConfig::default()
    }
}

/// Link-format body with `count` memento lines plus non-memento noise
pub fn link_format_body(count: usize) -> String {
    let mut body = String::from(
        "<http://cnn.com>; rel=\"original\",\n\
         <http://archive.example/timemap/link/http://cnn.com>; rel=\"self\"; type=\"application/link-format\",\n",
    );
    for i in 0..count {
        body.push_str(&format!(
            "<http://archive.example/web/2020010{i}000000/http://cnn.com>; rel=\"memento\"; datetime=\"0{i} Jan 2020 00:00:00 GMT\",\n",
            i = i + 1
        ));
    }
    body
}

pub fn sample_records() -> Vec<MementoRecord> {
    vec![
        MementoRecord::new(
            "http://web.archive.org/web/20200101000000/http://cnn.com",
            "20200101000000",
            "web.archive.org",
        ),
        MementoRecord::new(
            "http://arquivo.pt/wayback/20190101000000/http://cnn.com",
            "20190101000000",
            "arquivo.pt",
        ),
    ]
}

/// A relay running on an ephemeral local port
pub struct TestRelay {
    pub addr: SocketAddr,
    pub hub: RelayHub,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestRelay {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let config = RelayConfig::builder()
            .bind_address(addr)
            .enable_request_logging(false)
            .build()
            .unwrap();
        let server = RelayServer::new(config).unwrap();
        let hub = server.hub();

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            server
                .serve(listener, async move {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            hub,
            shutdown: Some(tx),
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Wait until the hub has registered exactly `n` connections
    pub async fn wait_for_connections(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if self.hub.connection_count().await.unwrap() == n {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("relay never reached {n} connections"));
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
