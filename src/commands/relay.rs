use anyhow::{Context, Result};
use std::net::SocketAddr;

use mink::config::Config;
use mink::relay::RelayServer;

use super::shutdown_signal;

/// Parameters for the relay command
pub struct RelayParams {
    pub bind: Option<SocketAddr>,
    pub no_cors: bool,
}

/// Run the broadcast relay until Ctrl+C
pub async fn relay_server(mut config: Config, params: RelayParams) -> Result<()> {
    if let Some(bind) = params.bind {
        config.relay.bind_address = bind;
    }
    if params.no_cors {
        config.relay.enable_cors = false;
    }
    config.relay.validate()?;

    let server = RelayServer::new(config.relay.clone()).context("Failed to create relay")?;

    println!("{}", server.info().display());
    println!();
    println!("Endpoints:");
    println!("  GET /         - WebSocket broadcast relay");
    println!("  GET /health   - Health check");
    println!("  GET /metrics  - Prometheus metrics endpoint");
    println!();
    println!("Press Ctrl+C to stop.\n");

    server
        .start_with_shutdown(shutdown_signal())
        .await
        .context("Relay server failed")?;

    println!("Relay stopped.");
    Ok(())
}
