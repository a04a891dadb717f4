//! Daemon-side overlay callbacks: log and keep an inbox of messages.

use floodmesh_core::{Packet, PacketType};
use floodmesh_services::{MessageStore, OverlayEvents, PeerSummary, ReceivedMessage};

pub struct DaemonEvents {
    inbox: MessageStore,
}

impl DaemonEvents {
    pub fn new(inbox: MessageStore) -> Self {
        Self { inbox }
    }
}

impl OverlayEvents for DaemonEvents {
    fn on_packet(&self, packet: &Packet) {
        if packet.kind != PacketType::Message {
            return;
        }
        let message = ReceivedMessage::from_packet(packet);
        tracing::info!(origin = %message.origin, text = %message.text, "message received");
        self.inbox.add(message);
    }

    fn on_membership_changed(&self, peers: &[PeerSummary]) {
        let gids: Vec<&str> = peers.iter().map(|p| p.gid.as_str()).collect();
        tracing::info!(count = peers.len(), peers = ?gids, "membership changed");
    }
}
