//! Long-lived session with one established peer.

use std::sync::Arc;

use floodmesh_services::{read_carrier, AddOutcome, Peer, PeerReader, RemoveOutcome};

use crate::node::Node;

/// Start a session task for a freshly established peer.
///
/// The session registers the peer itself; if the store rejects it the
/// connection is closed and the task ends.
pub(crate) fn spawn(node: Node, peer: Arc<Peer>, reader: PeerReader) {
    tokio::spawn(run(node, peer, reader));
}

async fn run(node: Node, peer: Arc<Peer>, mut reader: PeerReader) {
    match node.shared.store.add(Arc::clone(&peer)).await {
        Ok(AddOutcome::Added { connection_count }) => {
            tracing::info!(peer = %peer.gid(), id = %peer.id(), connection_count, "session established");
        }
        Ok(outcome) => {
            tracing::info!(peer = %peer.gid(), ?outcome, "session rejected");
            peer.close().await;
            return;
        }
        Err(e) => {
            tracing::warn!(peer = %peer.gid(), error = %e, "session not registered");
            peer.close().await;
            return;
        }
    }
    node.announce_meta().await;

    let mut shutdown = node.subscribe_shutdown();
    while !node.is_shutting_down() {
        tokio::select! {
            _ = shutdown.recv() => break,

            result = read_carrier(&mut reader) => match result {
                Ok(Some(carrier)) => {
                    peer.set_meta(carrier.meta);
                    if carrier.packet.kind.is_routed() {
                        node.receive_packet(carrier.packet).await;
                    }
                }
                Ok(None) => {
                    tracing::debug!(peer = %peer.gid(), "closed by remote");
                    break;
                }
                Err(e) if e.is_terminal() => {
                    tracing::warn!(peer = %peer.gid(), error = %e, "connection lost");
                    break;
                }
                Err(e) => {
                    tracing::warn!(peer = %peer.gid(), error = %e, "malformed frame skipped");
                }
            },
        }
    }

    peer.close().await;
    match node.shared.store.remove(peer.id()).await {
        Ok(RemoveOutcome::Removed { remaining }) => {
            tracing::info!(peer = %peer.gid(), remaining, "session closed");
            if node.is_shutting_down() {
                return;
            }
            node.self_heal(remaining).await;
            node.announce_meta().await;
        }
        Ok(RemoveOutcome::NotPresent) => {}
        Err(e) => tracing::warn!(peer = %peer.gid(), error = %e, "session not deregistered"),
    }
}
