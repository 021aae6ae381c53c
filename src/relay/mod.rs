//! Broadcast relay
//!
//! A WebSocket hub that forwards every message a client sends to all other
//! connected clients, plus the client side used to publish and listen.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  publish   ┌───────────────────┐  fan-out  ┌──────────┐
//! │ Producer │───────────▶│ Relay (hub task)  │──────────▶│ Listener │
//! └──────────┘            │ owns open sockets │──────────▶│ Browser  │
//!                         └───────────────────┘           └──────────┘
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod hub;
pub mod producer;
pub mod server;

pub use client::{decode_records, RelayClient};
pub use config::{RelayConfig, RelayConfigBuilder};
pub use hub::{ConnectionId, ConnectionState, FanOut, Frame, RelayHub};
pub use producer::{collect_broadcasts, run_producer, ProducerReport};
pub use server::{RelayServer, RelayState, ServerInfo};
