//! The running overlay node.
//!
//! `Node` is a cheap cloneable handle. Every protocol task (listener,
//! handshakes, peer sessions) holds one, and the daemon and the control
//! channel drive the node through its public methods.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};

use floodmesh_core::config::FloodmeshConfig;
use floodmesh_core::{Carrier, Packet, PeerMeta};
use floodmesh_services::{
    write_carrier, ControlCommand, ControlReceiver, MembershipHandle, MembershipStore,
    OverlayEvents, PeerSummary, SeenPackets, SendReceipt,
};

use crate::error::OverlayError;
use crate::session::listener::Listener;

pub(crate) struct Shared {
    pub(crate) gid: String,
    pub(crate) store: MembershipHandle,
    pub(crate) seen: SeenPackets,
    pub(crate) events: Arc<dyn OverlayEvents>,
    pub(crate) min_desired_peers: usize,
    pub(crate) handshake_timeout: Duration,
    shutting_down: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

#[derive(Clone)]
pub struct Node {
    pub(crate) shared: Arc<Shared>,
}

impl Node {
    /// Bind the listener, start the membership store and begin accepting.
    ///
    /// The node's GID is `<advertise_host>:<bound port>`, so a configured
    /// port of 0 yields the OS-assigned port.
    pub async fn start(
        config: &FloodmeshConfig,
        events: Arc<dyn OverlayEvents>,
    ) -> Result<Self, OverlayError> {
        let net = &config.network;
        let bind = format!("{}:{}", net.bind_addr, net.listen_port);
        let listener = TcpListener::bind(&bind)
            .await
            .map_err(|source| OverlayError::Bind {
                addr: bind.clone(),
                source,
            })?;
        let port = listener
            .local_addr()
            .map_err(|source| OverlayError::Bind { addr: bind, source })?
            .port();
        let gid = format!("{}:{}", net.advertise_host, port);

        let (store, handle) = MembershipStore::new(gid.clone(), events.clone());
        tokio::spawn(store.run());

        let (shutdown_tx, _) = broadcast::channel(1);
        let node = Node {
            shared: Arc::new(Shared {
                gid,
                store: handle,
                seen: SeenPackets::new(config.overlay.dedup_capacity),
                events,
                min_desired_peers: config.overlay.min_desired_peers,
                handshake_timeout: Duration::from_secs(net.handshake_timeout_secs),
                shutting_down: AtomicBool::new(false),
                shutdown_tx,
            }),
        };

        tokio::spawn(Listener::new(node.clone(), listener, node.subscribe_shutdown()).run());
        tracing::info!(gid = %node.gid(), "node listening");
        Ok(node)
    }

    pub fn gid(&self) -> &str {
        &self.shared.gid
    }

    pub fn local_meta(&self) -> PeerMeta {
        self.shared.store.local_meta()
    }

    /// Follows the local meta as membership changes.
    pub fn subscribe_meta(&self) -> watch::Receiver<PeerMeta> {
        self.shared.store.subscribe_meta()
    }

    pub async fn peers(&self) -> Result<Vec<PeerSummary>, OverlayError> {
        let peers = self.shared.store.snapshot().await?;
        Ok(peers.iter().map(|p| p.summary()).collect())
    }

    /// Flood an application payload to the whole overlay.
    pub async fn send_message(&self, payload: impl Into<Bytes>) -> Result<SendReceipt, OverlayError> {
        let packet = Packet::message(self.gid(), payload);
        let timestamp = packet.timestamp.clone();
        let delivered_to = self.announce(packet).await?;
        tracing::debug!(delivered_to, "message sent");
        Ok(SendReceipt {
            origin: self.gid().to_string(),
            timestamp,
            delivered_to,
        })
    }

    /// Ask the node at `address` to find us a place in its overlay.
    ///
    /// One transient connection carrying one CONN_REQ. Acceptance arrives
    /// later as an inbound CONN_ACK from whichever node admits us.
    pub async fn enter_network(&self, address: &str) -> Result<(), OverlayError> {
        if address == self.gid() {
            return Err(OverlayError::SelfConnect(address.to_string()));
        }
        if self.shared.store.contains_gid(address).await? {
            return Err(OverlayError::AlreadyConnected(address.to_string()));
        }

        let packet = Packet::conn_req(self.gid());
        self.shared.seen.first_sighting(packet.id());

        let mut stream = TcpStream::connect(address)
            .await
            .map_err(|source| OverlayError::Dial {
                addr: address.to_string(),
                source,
            })?;
        write_carrier(&mut stream, &Carrier::new(packet, self.local_meta())).await?;
        if let Err(e) = stream.shutdown().await {
            tracing::trace!(error = %e, "shutdown of join connection failed");
        }
        tracing::info!(bootstrap = address, "join request sent");
        Ok(())
    }

    /// Stop accepting, end every session and disable self-healing.
    pub async fn shutdown(&self) {
        if self.shared.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(gid = %self.gid(), "node shutting down");
        let _ = self.shared.shutdown_tx.send(());

        if let Ok(peers) = self.shared.store.snapshot().await {
            for peer in peers {
                peer.close().await;
            }
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.shutting_down.load(Ordering::SeqCst)
    }

    pub(crate) fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shared.shutdown_tx.subscribe()
    }

    /// Serve control commands until the channel closes or the node stops.
    pub async fn serve_control(self, mut rx: ControlReceiver) {
        let mut shutdown = self.subscribe_shutdown();
        loop {
            tokio::select! {
                _ = shutdown.recv() => return,
                cmd = rx.recv() => {
                    let Some(cmd) = cmd else { return };
                    self.handle_control(cmd).await;
                }
            }
        }
    }

    async fn handle_control(&self, cmd: ControlCommand) {
        match cmd {
            ControlCommand::SendMessage { payload, reply } => {
                let result = self.send_message(payload).await.map_err(|e| e.to_string());
                let _ = reply.send(result);
            }
            ControlCommand::EnterNetwork { address, reply } => {
                let result = self.enter_network(&address).await.map_err(|e| e.to_string());
                let _ = reply.send(result);
            }
            ControlCommand::Peers { reply } => {
                let peers = self.peers().await.unwrap_or_default();
                let _ = reply.send(peers);
            }
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node").field("gid", &self.shared.gid).finish()
    }
}
