//! Demo server with the Strict-Transport-Security layer installed.
//!
//! ```text
//!     Client / TLS proxy ──▶ request id ──▶ trace ──▶ origin ──▶ hsts ──▶ handler
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use hsts_layer::config::resolve_config;
use hsts_layer::lifecycle::{signals, Shutdown};
use hsts_layer::observability::init_logging;
use hsts_layer::HttpServer;

#[derive(Parser)]
#[command(name = "hsts-layer")]
#[command(about = "Serve with Strict-Transport-Security on https:443", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = resolve_config(cli.config.as_deref(), cli.bind)?;

    init_logging(&config.observability);
    tracing::info!("hsts-layer v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        hsts_enabled = config.hsts.enabled,
        max_age = config.hsts.max_age_in_seconds(),
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let _signal_task = signals::spawn_signal_handler(&shutdown);

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
