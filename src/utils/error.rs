//! Error types for the mink aggregator and relay
//!
//! This module defines custom error types used throughout the application.

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error (DNS, connection refused, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request exceeded its time bound and was cancelled
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Non-success status code
    #[error("HTTP status {0}")]
    Status(u16),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Soft failures degrade to an empty result for the affected provider
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_))
    }
}

/// Errors that can occur while interpreting provider responses
#[derive(Error, Debug)]
pub enum ParseError {
    /// Body is not valid JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// JSON parsed but has none of the known shapes
    #[error("Unexpected response shape (keys: {0})")]
    UnexpectedShape(String),
}

/// Errors raised by the broadcast relay and its clients
#[derive(Error, Debug)]
pub enum RelayError {
    /// Could not open the WebSocket connection
    #[error("Failed to connect to relay at {url}: {reason}")]
    Connect { url: String, reason: String },

    /// Sending a frame failed
    #[error("Failed to send to relay: {0}")]
    Send(String),

    /// Reading the next frame failed
    #[error("Failed to receive from relay: {0}")]
    Receive(String),

    /// The connection closed underneath the client
    #[error("Relay connection closed")]
    Closed,

    /// Payload could not be encoded
    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Failed to bind the listening socket
    #[error("Failed to bind relay: {0}")]
    Bind(String),

    /// Server loop terminated with an error
    #[error("Relay server error: {0}")]
    Serve(String),

    /// The hub task is gone
    #[error("Relay hub is not running")]
    HubStopped,
}

impl RelayError {
    /// Relay errors end the current client run; none are retried
    pub fn is_recoverable(&self) -> bool {
        false
    }
}
