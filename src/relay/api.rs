//! HTTP and WebSocket handlers for the relay
//!
//! `/` upgrades to a relay connection, `/health` reports liveness and
//! `/metrics` exposes Prometheus counters.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::metrics;

use super::hub::{ConnectionState, Frame, RelayHub};
use super::server::RelayState;

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub connections: usize,
}

// ============================================================================
// Routes
// ============================================================================

/// Create the relay router
pub fn create_router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(ws_upgrade))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<RelayState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    match state.hub.connection_count().await {
        Ok(connections) => (
            StatusCode::OK,
            Json(ApiResponse::success(HealthResponse {
                status: "healthy".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_secs: uptime,
                connections,
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        ),
    }
}

/// Prometheus text exposition
async fn metrics_handler() -> impl IntoResponse {
    match metrics::encode_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {e}"),
        ),
    }
}

// ============================================================================
// WebSocket
// ============================================================================

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<RelayState>) -> impl IntoResponse {
    debug!(state = ?ConnectionState::Connecting, "WebSocket upgrade requested");

    let hub = state.hub.clone();
    ws.max_message_size(state.config.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Serve one relay connection until the peer goes away
///
/// Inbound text and binary messages are broadcast to every other
/// connection; outbound frames are written by a dedicated task so a slow
/// reader never stalls the hub.
pub async fn handle_socket(socket: WebSocket, hub: RelayHub) {
    let (id, mut outbound) = match hub.join() {
        Ok(joined) => joined,
        Err(e) => {
            warn!(error = %e, "Rejecting connection");
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(frame_to_message(frame)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(message) = stream.next().await {
        let frame = match message {
            Ok(Message::Text(text)) => Frame::Text(text.as_str().to_owned()),
            Ok(Message::Binary(bytes)) => Frame::Binary(bytes),
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Err(e) => {
                debug!(connection = %id, error = %e, "Connection error");
                break;
            }
        };

        if let Err(e) = hub.broadcast(id, frame) {
            warn!(connection = %id, error = %e, "Broadcast failed");
            break;
        }
    }

    hub.leave(id);
    writer.abort();
    debug!(connection = %id, state = ?ConnectionState::Closed, "Connection finished");
}

fn frame_to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(bytes) => Message::Binary(bytes),
    }
}
