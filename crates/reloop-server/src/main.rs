//! Server binary: load settings, wire the state graph, serve HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use reloop_server::{pulse, routes, AppState};

#[derive(Debug, Parser)]
#[command(name = "reloop-server", about = "Real-time event fan-out service")]
struct Cli {
    /// Port to listen on (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Log level filter (overrides settings), e.g. `info` or `debug`.
    #[arg(long)]
    log_level: Option<String>,

    /// Path to a settings file (overrides the default location).
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => reloop_settings::load_settings_from_path(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => reloop_settings::load_settings().context("loading settings")?,
    };
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if let Some(level) = cli.log_level {
        settings.logging.level = level;
    }

    reloop_core::logging::init_subscriber(&settings.logging.level);

    let metrics_handle =
        reloop_server::metrics::install_recorder().context("installing metrics recorder")?;

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("invalid listen address")?;

    let state = AppState::new(settings, metrics_handle);
    let pulse_handle = pulse::spawn_pulse(Arc::clone(&state.dispatcher), state.heartbeat_period());

    let registry = Arc::clone(&state.registry);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "reloop-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    pulse_handle.abort();
    registry.close_all();
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
