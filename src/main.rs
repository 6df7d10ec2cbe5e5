use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use masking_proxy::config::{load_config, ProxyConfig};
use masking_proxy::lifecycle::{signals, Shutdown};
use masking_proxy::observability::init_logging;
use masking_proxy::HttpServer;

/// Reverse proxy that logs every exchange with sensitive data masked.
#[derive(Debug, Parser)]
#[command(name = "masking-proxy", version, about)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long, env = "MASKING_PROXY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    init_logging(&config.observability)?;

    tracing::info!("masking-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let receiver = shutdown.subscribe();

    let signal_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { signals::trigger_on_signal(&shutdown).await })
    };

    server.run(listener, receiver).await?;
    signal_task.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
