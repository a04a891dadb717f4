//! Callbacks from the overlay to the application.
//!
//! These are the only way the overlay talks upward. Implementations are
//! invoked from protocol tasks (the membership callback from the membership
//! store's own task) and must return quickly without calling back into the
//! node.

use floodmesh_core::Packet;

use crate::peer::PeerSummary;

pub trait OverlayEvents: Send + Sync {
    /// A packet this node had not seen before arrived from a neighbour.
    fn on_packet(&self, packet: &Packet);

    /// The peer set changed. `peers` is the set after the change.
    fn on_membership_changed(&self, peers: &[PeerSummary]);
}

/// Ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl OverlayEvents for NoopEvents {
    fn on_packet(&self, _packet: &Packet) {}

    fn on_membership_changed(&self, _peers: &[PeerSummary]) {}
}
