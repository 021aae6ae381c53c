//! Relay server implementation
//!
//! Wires the hub, the router and the listening socket together.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Instant;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::utils::error::RelayError;

use super::api::create_router;
use super::config::RelayConfig;
use super::hub::RelayHub;

// ============================================================================
// App State
// ============================================================================

/// Shared relay state
#[derive(Clone)]
pub struct RelayState {
    /// Connection hub
    pub hub: RelayHub,

    /// Server start time
    pub start_time: Instant,

    /// Configuration
    pub config: RelayConfig,
}

// ============================================================================
// Relay Server
// ============================================================================

/// Broadcast relay server
pub struct RelayServer {
    config: RelayConfig,
    state: RelayState,
}

impl RelayServer {
    /// Create a new relay server
    ///
    /// Spawns the hub task, so this must run inside a tokio runtime.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        config
            .validate()
            .map_err(|e| RelayError::Bind(e.to_string()))?;

        let state = RelayState {
            hub: RelayHub::spawn(),
            start_time: Instant::now(),
            config: config.clone(),
        };

        Ok(Self { config, state })
    }

    /// Get the shared state
    pub fn state(&self) -> RelayState {
        self.state.clone()
    }

    /// Get a handle to the hub
    pub fn hub(&self) -> RelayHub {
        self.state.hub.clone()
    }

    /// Build the router with all routes and layers
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Bind the configured address and serve until the process ends
    pub async fn start(&self) -> Result<(), RelayError> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Bind the configured address and serve until `shutdown_signal` fires
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), RelayError> {
        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| RelayError::Bind(format!("{}: {e}", self.config.bind_address)))?;

        self.serve(listener, shutdown_signal).await
    }

    /// Serve on an already bound listener
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), RelayError> {
        let addr = listener
            .local_addr()
            .map_err(|e| RelayError::Bind(e.to_string()))?;

        tracing::info!("Relay listening on ws://{}", addr);

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| RelayError::Serve(e.to_string()))?;

        tracing::info!("Relay shutdown complete");
        Ok(())
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            bind_address: self.config.bind_address,
            max_message_bytes: self.config.max_message_bytes,
            cors_enabled: self.config.enable_cors,
            request_logging_enabled: self.config.enable_request_logging,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub max_message_bytes: usize,
    pub cors_enabled: bool,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Mink Relay\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Max Message: {} bytes\n\
             CORS: {}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            self.max_message_bytes,
            if self.cors_enabled { "enabled" } else { "disabled" },
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_server_creation() {
        let server = RelayServer::new(RelayConfig::default());
        assert!(server.is_ok());
    }

    #[tokio::test]
    async fn test_server_info() {
        let config = RelayConfig::builder().enable_cors(false).build().unwrap();
        let server = RelayServer::new(config).unwrap();
        let info = server.info();

        assert!(!info.cors_enabled);
        assert_eq!(info.bind_address.port(), 8081);
        assert!(info.display().contains("CORS: disabled"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let server = RelayServer::new(RelayConfig::default()).unwrap();
        let router = server.build_router();

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"]["status"], "healthy");
        assert_eq!(json["data"]["connections"], 0);
    }

    #[tokio::test]
    async fn test_plain_get_on_root_is_not_upgraded() {
        let server = RelayServer::new(RelayConfig::default()).unwrap();
        let router = server.build_router();

        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }
}
