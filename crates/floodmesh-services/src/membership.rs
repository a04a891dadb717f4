//! Membership store: the single owner of the peer set.
//!
//! The set lives inside one task. Everything else holds a
//! `MembershipHandle` and talks to that task over a command channel; each
//! command carries a oneshot reply that is only sent once the mutation has
//! been applied and the local meta recomputed. A caller that awaited `add`
//! can therefore rely on the peer being visible to every later reader.
//!
//! The local connection count is published on a watch channel so senders
//! always stamp outgoing carriers with the current value.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use floodmesh_core::PeerMeta;

use crate::events::OverlayEvents;
use crate::peer::{Peer, PeerId, PeerSummary};

const COMMAND_QUEUE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("membership store is no longer running")]
pub struct StoreError;

/// Result of `MembershipHandle::add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added { connection_count: usize },
    /// A peer with the same GID is already a member.
    DuplicateGid,
    /// The peer's GID is our own.
    SelfConnection,
}

/// Result of `MembershipHandle::remove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed { remaining: usize },
    NotPresent,
}

enum Command {
    Add {
        peer: Arc<Peer>,
        reply: oneshot::Sender<AddOutcome>,
    },
    Remove {
        id: PeerId,
        reply: oneshot::Sender<RemoveOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<Arc<Peer>>>,
    },
}

/// Cloneable access to the membership store.
#[derive(Clone)]
pub struct MembershipHandle {
    tx: mpsc::Sender<Command>,
    local_meta: watch::Receiver<PeerMeta>,
}

impl MembershipHandle {
    /// Add a peer and wait until it is visible.
    pub async fn add(&self, peer: Arc<Peer>) -> Result<AddOutcome, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Add { peer, reply })
            .await
            .map_err(|_| StoreError)?;
        rx.await.map_err(|_| StoreError)
    }

    /// Remove a peer and wait until the removal is applied.
    pub async fn remove(&self, id: PeerId) -> Result<RemoveOutcome, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Remove { id, reply })
            .await
            .map_err(|_| StoreError)?;
        rx.await.map_err(|_| StoreError)
    }

    /// Current peers, ordered by `PeerId`.
    pub async fn snapshot(&self) -> Result<Vec<Arc<Peer>>, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| StoreError)?;
        rx.await.map_err(|_| StoreError)
    }

    pub async fn contains_gid(&self, gid: &str) -> Result<bool, StoreError> {
        Ok(self.snapshot().await?.iter().any(|p| p.gid() == gid))
    }

    /// This node's meta as of the last membership change.
    pub fn local_meta(&self) -> PeerMeta {
        self.local_meta.borrow().clone()
    }

    pub fn subscribe_meta(&self) -> watch::Receiver<PeerMeta> {
        self.local_meta.clone()
    }
}

/// Owner of the peer set. Construct with `new`, then `tokio::spawn(store.run())`.
pub struct MembershipStore {
    local_gid: String,
    peers: HashMap<PeerId, Arc<Peer>>,
    rx: mpsc::Receiver<Command>,
    meta_tx: watch::Sender<PeerMeta>,
    events: Arc<dyn OverlayEvents>,
}

impl MembershipStore {
    pub fn new(local_gid: impl Into<String>, events: Arc<dyn OverlayEvents>) -> (Self, MembershipHandle) {
        let local_gid = local_gid.into();
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let (meta_tx, meta_rx) = watch::channel(PeerMeta::new(local_gid.clone(), 0));
        let store = Self {
            local_gid,
            peers: HashMap::new(),
            rx,
            meta_tx,
            events,
        };
        let handle = MembershipHandle {
            tx,
            local_meta: meta_rx,
        };
        (store, handle)
    }

    /// Serve commands until every handle is dropped.
    pub async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                Command::Add { peer, reply } => {
                    let _ = reply.send(self.add(peer));
                }
                Command::Remove { id, reply } => {
                    let _ = reply.send(self.remove(id));
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.sorted_peers());
                }
            }
        }
        tracing::debug!(gid = %self.local_gid, "membership store stopped");
    }

    fn add(&mut self, peer: Arc<Peer>) -> AddOutcome {
        let gid = peer.gid();
        if gid == self.local_gid {
            tracing::info!(peer = %peer.id(), "refusing connection to self");
            return AddOutcome::SelfConnection;
        }
        if self.peers.values().any(|p| p.gid() == gid) {
            tracing::info!(peer = %peer.id(), %gid, "already connected");
            return AddOutcome::DuplicateGid;
        }

        tracing::info!(peer = %peer.id(), %gid, "peer added");
        self.peers.insert(peer.id(), peer);
        self.changed();
        AddOutcome::Added {
            connection_count: self.peers.len(),
        }
    }

    fn remove(&mut self, id: PeerId) -> RemoveOutcome {
        let Some(peer) = self.peers.remove(&id) else {
            return RemoveOutcome::NotPresent;
        };
        tracing::info!(peer = %id, gid = %peer.gid(), "peer removed");
        self.changed();
        RemoveOutcome::Removed {
            remaining: self.peers.len(),
        }
    }

    fn changed(&self) {
        let count = self.peers.len() as u32;
        self.meta_tx
            .send_replace(PeerMeta::new(self.local_gid.clone(), count));

        let summaries: Vec<PeerSummary> = self.sorted_peers().iter().map(|p| p.summary()).collect();
        self.events.on_membership_changed(&summaries);
    }

    fn sorted_peers(&self) -> Vec<Arc<Peer>> {
        let mut peers: Vec<Arc<Peer>> = self.peers.values().cloned().collect();
        peers.sort_by_key(|p| p.id());
        peers
    }
}
