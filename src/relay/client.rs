//! Relay client
//!
//! A thin WebSocket client used by the producer to publish memento lists and
//! by listeners to receive what other clients publish.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::models::MementoRecord;
use crate::utils::error::{ParseError, RelayError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Time allowed for the opening handshake
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Relay Client
// ============================================================================

/// An open connection to the relay
pub struct RelayClient {
    url: String,
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl RelayClient {
    /// Connect and wait until the connection is open
    pub async fn connect(url: &str) -> Result<Self, RelayError> {
        let connect_error = |reason: String| RelayError::Connect {
            url: url.to_string(),
            reason,
        };

        let (socket, _response) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| connect_error(format!("no handshake within {CONNECT_TIMEOUT:?}")))?
            .map_err(|e| connect_error(e.to_string()))?;

        info!(relay = %url, "Connected to relay");

        let (sink, stream) = socket.split();
        Ok(Self {
            url: url.to_string(),
            sink,
            stream,
        })
    }

    /// Relay URL this client is connected to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Publish records as one JSON array text message
    ///
    /// Returns the payload size in bytes.
    pub async fn publish(&mut self, records: &[MementoRecord]) -> Result<usize, RelayError> {
        let payload = serde_json::to_string(records)?;
        let bytes = payload.len();

        self.send_text(payload).await?;
        debug!(records = records.len(), bytes, "Published to relay");
        Ok(bytes)
    }

    /// Send one raw text message
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), RelayError> {
        self.sink
            .send(Message::text(text.into()))
            .await
            .map_err(send_error)
    }

    /// Wait for the next text or binary message
    ///
    /// Binary payloads are decoded as UTF-8 (lossy). Returns `None` once the
    /// relay closes the connection.
    pub async fn recv_text(&mut self) -> Result<Option<String>, RelayError> {
        while let Some(message) = self.stream.next().await {
            match message.map_err(receive_error)? {
                Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
                Message::Binary(bytes) => {
                    return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }

        Ok(None)
    }

    /// Close the connection
    pub async fn close(mut self) -> Result<(), RelayError> {
        self.sink.close().await.map_err(send_error)
    }
}

fn send_error(err: WsError) -> RelayError {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => RelayError::Closed,
        other => RelayError::Send(other.to_string()),
    }
}

fn receive_error(err: WsError) -> RelayError {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => RelayError::Closed,
        other => RelayError::Receive(other.to_string()),
    }
}

// ============================================================================
// Payload Decoding
// ============================================================================

/// Decode a relayed payload into memento records
///
/// Accepts a JSON array of records or a single record object.
pub fn decode_records(payload: &str) -> Result<Vec<MementoRecord>, ParseError> {
    match serde_json::from_str::<Value>(payload)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(ParseError::from))
            .collect(),
        object @ Value::Object(_) => Ok(vec![serde_json::from_value(object)?]),
        other => Err(ParseError::UnexpectedShape(json_kind(&other).to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
