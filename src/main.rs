use std::path::PathBuf;

use clap::Parser;
use portcullis::{AppState, build_router, config::GatewayConfig, observability};

#[derive(Debug, Parser)]
#[command(name = "portcullis", version, about)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "portcullis.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = GatewayConfig::from_file(&cli.config)?;
    observability::init_tracing(&config.observability.logging);

    let addr = config.server.bind_addr();
    let state = AppState::new(config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, version = env!("CARGO_PKG_VERSION"), "portcullis listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown signal handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
