use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{AggregateParams, CollectParams, ListenParams, RelayParams};

#[derive(Parser)]
#[command(
    name = "mink",
    version,
    about = "Memento aggregator with a WebSocket broadcast relay",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file (defaults to MINK_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the WebSocket broadcast relay
    Relay {
        /// Bind address, e.g. 0.0.0.0:8081
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Disable CORS headers
        #[arg(long, default_value = "false")]
        no_cors: bool,
    },

    /// Aggregate mementos for a URL and publish them to the relay
    Aggregate {
        /// Original URL to look up
        #[arg(short, long)]
        url: Option<String>,

        /// Relay WebSocket URL
        #[arg(short, long)]
        relay: Option<String>,

        /// Also write the records to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep listening for broadcasts after publishing
        #[arg(long, default_value = "false")]
        listen: bool,
    },

    /// Aggregate mementos for a URL without a relay
    Collect {
        /// Original URL to look up
        #[arg(short, long)]
        url: Option<String>,

        /// Write the records to this JSON file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Listen to the relay and show received mementos
    Listen {
        /// Relay WebSocket URL
        #[arg(short, long)]
        relay: Option<String>,

        /// Only show records from this source
        #[arg(short, long)]
        source: Option<String>,

        /// Earliest capture date (YYYY-MM-DD or YYYYMMDDhhmmss)
        #[arg(long)]
        from: Option<String>,

        /// Latest capture date (YYYY-MM-DD or YYYYMMDDhhmmss)
        #[arg(long)]
        to: Option<String>,

        /// Write the matching records to this JSON file on exit
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref())?;

    // Initialize tracing/logging
    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    if let Err(e) = mink::metrics::init_metrics() {
        tracing::warn!("Metrics disabled: {}", e);
    }

    tracing::info!("mink starting");

    match cli.command {
        Commands::Relay { bind, no_cors } => {
            tracing::info!(bind = ?bind, no_cors = %no_cors, "Starting relay command");
            commands::relay_server(config, RelayParams { bind, no_cors }).await?;
        }

        Commands::Aggregate {
            url,
            relay,
            output,
            listen,
        } => {
            tracing::info!(
                url = ?url,
                relay = ?relay,
                output = ?output,
                listen = %listen,
                "Starting aggregate command"
            );
            commands::aggregate(
                config,
                AggregateParams {
                    url,
                    relay,
                    output,
                    listen,
                },
            )
            .await?;
        }

        Commands::Collect { url, output } => {
            tracing::info!(url = ?url, output = ?output, "Starting collect command");
            commands::collect(config, CollectParams { url, output }).await?;
        }

        Commands::Listen {
            relay,
            source,
            from,
            to,
            output,
        } => {
            tracing::info!(
                relay = ?relay,
                source = ?source,
                from = ?from,
                to = ?to,
                "Starting listen command"
            );
            commands::listen(
                config,
                ListenParams {
                    relay,
                    source,
                    from,
                    to,
                    output,
                },
            )
            .await?;
        }
    }

    tracing::info!("mink completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("mink=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("mink={level},warn"))?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
