//! nexusd — sensor-node introduction broker.
//!
//! Usage: nexusd [listen-addr]

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use nexus_core::config::NexusConfig;
use nexus_services::{Broker, DashboardFeed, NodeListener};

/// Renderings buffered per dashboard before a slow one starts skipping.
const FEED_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = NexusConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let mut config = NexusConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        NexusConfig::default()
    });

    if let Some(arg) = std::env::args().nth(1) {
        config.network.listen_addr = arg
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid listen address {arg:?}"))?;
    }
    tracing::info!(
        listen = %config.network.listen_addr,
        api = %config.network.api_addr,
        frame_mode = ?config.broker.frame_mode,
        reregistration = ?config.broker.reregistration,
        departure_match = ?config.broker.departure_match,
        purge_on_disconnect = config.broker.purge_on_disconnect,
        "nexusd starting"
    );

    // Shared state
    let feed = DashboardFeed::new(FEED_CAPACITY);
    let broker = Broker::new(config.broker.clone(), Arc::new(feed.clone()));

    let listener = TcpListener::bind(config.network.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.network.listen_addr))?;
    let listen_addr = listener.local_addr()?;

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let listener_task = tokio::spawn(
        NodeListener::new(listener, broker.clone(), shutdown_tx.subscribe()).run(),
    );

    let api_task = {
        let state = nexus_api::ApiState {
            broker: broker.clone(),
            feed,
            listen_addr,
        };
        let api_addr = config.network.api_addr;
        tokio::spawn(async move {
            if let Err(e) = nexus_api::serve(state, api_addr).await {
                tracing::error!(error = %e, "API server failed");
            }
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = listener_task      => tracing::error!("node listener exited: {:?}", r),
        r = api_task           => tracing::error!("API server exited: {:?}", r),
    }

    tracing::info!(nodes = broker.registry().len(), "nexusd stopped");
    Ok(())
}
