//! LedgerLink server — signs users in and serves their account balances.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ledgerlink_server::{
    AppConfig, AppState, OriginPolicy, PlaidClient, SessionFlow, TokenStore, router,
};
use tracing::info;

/// LedgerLink bank-linking backend.
#[derive(Parser, Debug)]
#[command(name = "ledgerlink-server", about = "LedgerLink bank-linking backend")]
struct Args {
    /// Port to listen on (overrides `LISTEN_PORT`).
    #[arg(long)]
    port: Option<u16>,

    /// Token store snapshot file (overrides `TOKEN_DB_PATH`).
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging (controlled via RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env();
    if let Some(port) = args.port {
        config.listen_port = port;
    }
    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }

    // The store must be readable before anything is served.
    let store = TokenStore::open(&config.db_path, config.writer)
        .await
        .context("token store unavailable")?;

    let provider = PlaidClient::new(&config.plaid).context("invalid provider configuration")?;
    info!(
        environment = %config.plaid.environment,
        base_url = %config.plaid.base_url,
        timeout_secs = config.plaid.timeout.as_secs(),
        "provider client configured"
    );

    let state = Arc::new(AppState {
        flow: SessionFlow::new(store.clone(), Arc::new(provider), config.link.clone()),
    });
    let app = router(state, OriginPolicy::new(config.allowed_origins));

    let addr = format!("0.0.0.0:{}", config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(address = %addr, "ledgerlink server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("draining token store");
    store.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
