mod config;
mod indicators;
mod klines;
mod scanner;
mod state;
mod symbols;
mod web;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use config::ScreenerConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ScreenerConfig::from_env();
    config.validate()?;
    let addr = config.listen_addr()?;

    let state = AppState::new(config)?;

    // Background scan loop; the web side only ever reads its output.
    tokio::spawn(scanner::run_scan_loop(Arc::clone(&state)));

    let app = web::router(state);

    tracing::info!("RSI screener listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping");
}
