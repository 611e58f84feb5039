// crates/server/src/main.rs
//! GlassBox server binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use glassbox_server::config::LogFormat;
use glassbox_server::{create_app, init_metrics, AppState, Config};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,glassbox_server=info,glassbox_core=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.compact().init(),
    }
}

/// Resolves on Ctrl-C and closes the event bus, which ends every open
/// status stream so graceful shutdown is not held up by them.
async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
    state.bus.shutdown();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format);
    init_metrics();

    let state = AppState::new(&config);
    let app = create_app(Arc::clone(&state), &config);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        %addr,
        public_url = %config.public_url(),
        dev_auth = config.dev_auth,
        stage_interval_ms = config.stage_interval_ms,
        version = env!("CARGO_PKG_VERSION"),
        "glassbox listening"
    );
    if config.dev_auth {
        tracing::warn!("dev auth enabled: unauthenticated requests get a development session");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&state)))
        .await
        .context("server error")?;

    // Idempotent; covers the case where the server stopped on its own.
    state.bus.shutdown();
    tracing::info!("server stopped");
    Ok(())
}
