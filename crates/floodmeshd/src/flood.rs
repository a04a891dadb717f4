//! Flood broadcast with duplicate suppression.

use floodmesh_core::{Carrier, Packet, PacketType};

use crate::error::OverlayError;
use crate::node::Node;

impl Node {
    /// Handle a MESSAGE or CONN_REQ that arrived from a neighbour.
    pub(crate) async fn receive_packet(&self, packet: Packet) {
        let id = packet.id();
        if !self.shared.seen.first_sighting(id) {
            tracing::debug!(
                packet = %id.short(),
                origin = %packet.origin,
                remembered = self.shared.seen.len(),
                "duplicate dropped"
            );
            return;
        }

        self.shared.events.on_packet(&packet);

        match packet.kind {
            PacketType::Message => {
                if let Err(e) = self.broadcast(&packet).await {
                    tracing::warn!(error = %e, "re-broadcast failed");
                }
            }
            PacketType::ConnReq => self.admit(packet).await,
            PacketType::ConnAck | PacketType::Blank => {}
        }
    }

    /// Send a packet of our own to every peer. Returns how many peers took it.
    pub(crate) async fn announce(&self, packet: Packet) -> Result<usize, OverlayError> {
        if packet.kind.is_routed() {
            self.shared.seen.first_sighting(packet.id());
        }
        self.broadcast(&packet).await
    }

    /// Tell every neighbour our current connection count.
    pub(crate) async fn announce_meta(&self) {
        if let Err(e) = self.announce(Packet::blank(self.gid())).await {
            tracing::warn!(error = %e, "meta announcement failed");
        }
    }

    async fn broadcast(&self, packet: &Packet) -> Result<usize, OverlayError> {
        let peers = self.shared.store.snapshot().await?;
        let carrier = Carrier::new(packet.clone(), self.local_meta());

        let mut delivered = 0;
        for peer in peers.iter().filter(|p| p.gid() != packet.origin) {
            match peer.send(&carrier).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(peer = %peer.gid(), error = %e, "write to peer failed");
                }
            }
        }
        tracing::debug!(
            kind = ?packet.kind,
            packet = %packet.id().short(),
            delivered,
            "flooded"
        );
        Ok(delivered)
    }
}
