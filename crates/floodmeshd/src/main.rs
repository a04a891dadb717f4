//! floodmeshd: flood-broadcast overlay daemon.

use std::sync::Arc;

use anyhow::{Context, Result};

use floodmesh_core::config::FloodmeshConfig;
use floodmesh_services::{control_channel, MessageStore};

use floodmeshd::{DaemonEvents, Node};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = FloodmeshConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let mut config = FloodmeshConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        FloodmeshConfig::default()
    });

    if let Some(port) = std::env::args().nth(1) {
        config.network.listen_port = port
            .parse()
            .with_context(|| format!("invalid listen port {port:?}"))?;
    }
    tracing::info!(
        port = config.network.listen_port,
        min_desired_peers = config.overlay.min_desired_peers,
        "floodmeshd starting"
    );

    // ── Node ─────────────────────────────────────────────────────────────────
    let inbox = MessageStore::new();
    let node = Node::start(&config, Arc::new(DaemonEvents::new(inbox.clone())))
        .await
        .context("failed to start node")?;

    for address in &config.network.bootstrap {
        if let Err(e) = node.enter_network(address).await {
            tracing::warn!(bootstrap = %address, error = %e, "failed to enter network");
        }
    }

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Control API ──────────────────────────────────────────────────────────
    if config.api.enabled {
        let (control_tx, control_rx) = control_channel(64);
        tokio::spawn(node.clone().serve_control(control_rx));

        let state = floodmesh_api::ApiState {
            control_tx,
            inbox,
            local_meta: node.subscribe_meta(),
            shutdown_tx: shutdown_tx.clone(),
        };
        let port = config.api.port;
        tokio::spawn(async move {
            if let Err(e) = floodmesh_api::serve(state, port).await {
                tracing::error!(error = %e, "API server failed");
            }
        });
    }

    // ── Wait for exit ────────────────────────────────────────────────────────

    let _ = shutdown_rx.recv().await;
    tracing::info!("shutting down");

    node.shutdown().await;
    Ok(())
}
