//! Join handling: route a CONN_REQ, dial accepted requesters, self-heal.

use std::sync::Arc;

use tokio::net::TcpStream;

use floodmesh_core::{Carrier, Packet, PeerMeta};
use floodmesh_services::{route, Peer, Route};

use crate::error::OverlayError;
use crate::node::Node;
use crate::session;

impl Node {
    /// Satisfy a join request here or pass it toward the least-loaded peer.
    pub(crate) async fn admit(&self, packet: Packet) {
        self.shared.seen.first_sighting(packet.id());

        let peers = match self.shared.store.snapshot().await {
            Ok(peers) => peers,
            Err(e) => {
                tracing::warn!(error = %e, "cannot route join request");
                return;
            }
        };
        let local = self.local_meta();
        let candidates = peers.iter().map(|p| (Arc::clone(p), p.meta()));

        match route(&local, &packet.origin, candidates) {
            Route::Local => {
                let origin = packet.origin.clone();
                tracing::info!(requester = %origin, load = local.connection_count, "accepting join request");
                if let Err(e) = self.accept_requester(&origin).await {
                    tracing::info!(requester = %origin, error = %e, "admission aborted");
                }
            }
            Route::Forward(peer) => {
                tracing::info!(
                    requester = %packet.origin,
                    via = %peer.gid(),
                    load = peer.meta().connection_count,
                    "forwarding join request"
                );
                if let Err(e) = peer.send(&Carrier::new(packet, local)).await {
                    tracing::warn!(peer = %peer.gid(), error = %e, "forwarding join request failed");
                }
            }
            Route::Unroutable => {
                tracing::info!("no peer to carry own join request");
            }
        }
    }

    /// Dial the requester, acknowledge, and start a session on the connection.
    async fn accept_requester(&self, origin: &str) -> Result<(), OverlayError> {
        if origin == self.gid() {
            return Err(OverlayError::SelfConnect(origin.to_string()));
        }
        if self.shared.store.contains_gid(origin).await? {
            return Err(OverlayError::AlreadyConnected(origin.to_string()));
        }

        let stream = TcpStream::connect(origin)
            .await
            .map_err(|source| OverlayError::Dial {
                addr: origin.to_string(),
                source,
            })?;
        let (peer, reader) = Peer::from_tcp(stream, PeerMeta::new(origin, 0));
        peer.send(&Carrier::new(Packet::conn_ack(), self.local_meta()))
            .await?;

        session::spawn(self.clone(), peer, reader);
        Ok(())
    }

    /// Issue one join request of our own after losing a peer.
    pub(crate) async fn self_heal(&self, remaining: usize) {
        if self.is_shutting_down() || remaining >= self.shared.min_desired_peers {
            return;
        }
        tracing::info!(
            remaining,
            desired = self.shared.min_desired_peers,
            "below desired peer count, requesting replacement"
        );
        self.admit(Packet::conn_req(self.gid())).await;
    }
}
